use url::Url;

pub const PROXY_BASE_URL: &str = "https://wsrv.nl/";

pub const DETAIL_COVER_WIDTH: u32 = 135;
pub const DETAIL_COVER_HEIGHT: u32 = 200;
pub const DEFAULT_DPR: u32 = 2;

/// Resizing-proxy URL for `src`; zero-valued dimensions are left out.
pub fn proxied_image_url(src: &str, width: u32, height: u32, dpr: u32) -> Option<Url> {
    let src = src.trim();
    if src.is_empty() {
        return None;
    }

    let mut url = Url::parse(PROXY_BASE_URL).ok()?;
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("url", src);
        for (name, value) in [("w", width), ("h", height), ("dpr", dpr)] {
            if value > 0 {
                query.append_pair(name, &value.to_string());
            }
        }
    }
    Some(url)
}

/// Only absolute http(s) sources are proxied.
pub fn is_proxyable_source(src: &str) -> bool {
    Url::parse(src.trim())
        .map(|url| matches!(url.scheme(), "http" | "https") && url.host_str().is_some())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_proxy_url_with_encoded_source() {
        let url = proxied_image_url("https://img.example/a b.jpg?x=1&y=2", 135, 200, 2).unwrap();
        assert_eq!(
            url.as_str(),
            "https://wsrv.nl/?url=https%3A%2F%2Fimg.example%2Fa+b.jpg%3Fx%3D1%26y%3D2&w=135&h=200&dpr=2"
        );
    }

    #[test]
    fn zero_dimensions_are_omitted() {
        let url = proxied_image_url("https://img.example/a.jpg", 0, 0, 2).unwrap();
        assert_eq!(url.query(), Some("url=https%3A%2F%2Fimg.example%2Fa.jpg&dpr=2"));
        assert!(proxied_image_url("  ", 10, 10, 1).is_none());
    }

    #[test]
    fn only_http_sources_are_proxyable() {
        assert!(is_proxyable_source("https://img.example/a.jpg"));
        assert!(!is_proxyable_source("file:///etc/passwd"));
        assert!(!is_proxyable_source("/relative.png"));
    }
}
