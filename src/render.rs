use std::fmt::Write as _;

use url::Url;

use crate::config::DEFAULT_WORKSPACE_DOMAIN;
use crate::cover::is_proxyable_source;
use crate::notion::{BlockKind, ContentBlock, RichText};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListKind {
    Bulleted,
    Numbered,
}

impl ListKind {
    fn open_tag(self) -> &'static str {
        match self {
            Self::Bulleted => "<ul>\n",
            Self::Numbered => "<ol>\n",
        }
    }

    fn close_tag(self) -> &'static str {
        match self {
            Self::Bulleted => "</ul>\n",
            Self::Numbered => "</ol>\n",
        }
    }
}

/// Turns content blocks into an HTML fragment.
#[derive(Debug, Clone)]
pub struct Renderer {
    workspace_domain: String,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new(DEFAULT_WORKSPACE_DOMAIN)
    }
}

impl Renderer {
    pub fn new(workspace_domain: &str) -> Self {
        Self {
            workspace_domain: workspace_domain.trim().to_ascii_lowercase(),
        }
    }

    /// Renders blocks in order. Runs of list items of the same kind share one
    /// `<ul>`/`<ol>`; everything else is emitted block by block.
    pub fn render(&self, blocks: &[ContentBlock]) -> String {
        let mut html = String::new();
        let mut open_list: Option<ListKind> = None;

        for block in blocks {
            let list_kind = match &block.kind {
                BlockKind::BulletedListItem(_) => Some(ListKind::Bulleted),
                BlockKind::NumberedListItem(_) => Some(ListKind::Numbered),
                _ => None,
            };

            let rendered = self.render_block(block);
            if rendered.is_empty() {
                continue;
            }

            if open_list != list_kind {
                if let Some(kind) = open_list {
                    html.push_str(kind.close_tag());
                }
                if let Some(kind) = list_kind {
                    html.push_str(kind.open_tag());
                }
                open_list = list_kind;
            }
            html.push_str(&rendered);
        }

        if let Some(kind) = open_list {
            html.push_str(kind.close_tag());
        }
        html
    }

    /// Renders a single block; blocks without visible text render as `""`.
    pub fn render_block(&self, block: &ContentBlock) -> String {
        match &block.kind {
            BlockKind::Divider => "<hr />\n".to_owned(),
            BlockKind::Unsupported(kind) => format!(
                "<div class=\"unsupported-block\">Unsupported block type: {}</div>\n",
                escape_html(kind)
            ),
            BlockKind::Image { url, caption } => {
                if !is_proxyable_source(url) {
                    return String::new();
                }
                let alt = caption
                    .iter()
                    .map(|span| span.plain_text.as_str())
                    .collect::<String>();
                let mut out = format!(
                    "<figure><img src=\"{}\" alt=\"{}\" />",
                    escape_html(url),
                    escape_html(&alt)
                );
                if !is_blank(caption) {
                    let _ = write!(out, "<figcaption>{}</figcaption>", self.rich_text(caption));
                }
                out.push_str("</figure>\n");
                out
            }
            BlockKind::Paragraph(text) => self.wrap("<p>", text, "</p>"),
            BlockKind::Heading { level, text } => {
                let level = (*level).clamp(1, 3);
                self.wrap(&format!("<h{level}>"), text, &format!("</h{level}>"))
            }
            BlockKind::BulletedListItem(text) | BlockKind::NumberedListItem(text) => {
                self.wrap("<li>", text, "</li>")
            }
            BlockKind::ToDo { checked, text } => {
                let open = if *checked {
                    "<div class=\"to-do\"><input type=\"checkbox\" checked disabled /> "
                } else {
                    "<div class=\"to-do\"><input type=\"checkbox\" disabled /> "
                };
                self.wrap(open, text, "</div>")
            }
            BlockKind::Quote(text) => self.wrap("<blockquote>", text, "</blockquote>"),
            BlockKind::Code { language, text } => {
                let language = language.split_whitespace().collect::<Vec<_>>().join("-");
                let open = format!(
                    "<pre><code class=\"language-{}\">",
                    escape_html(&language)
                );
                self.wrap(&open, text, "</code></pre>")
            }
            BlockKind::Callout { emoji, text } => {
                let open = match emoji.as_deref().filter(|e| !e.is_empty()) {
                    Some(emoji) => format!(
                        "<div class=\"callout\"><div class=\"callout-emoji\">{}</div><div>",
                        escape_html(emoji)
                    ),
                    None => "<div class=\"callout\"><div>".to_owned(),
                };
                self.wrap(&open, text, "</div></div>")
            }
        }
    }

    fn wrap(&self, open: &str, text: &[RichText], close: &str) -> String {
        if is_blank(text) {
            return String::new();
        }
        format!("{open}{}{close}\n", self.rich_text(text))
    }

    /// Escapes each span, then applies its annotations and link.
    pub fn rich_text(&self, spans: &[RichText]) -> String {
        let mut html = String::new();
        for span in spans {
            let mut content = escape_html(&span.plain_text);
            let annotations = &span.annotations;
            if annotations.bold {
                content = format!("<strong>{content}</strong>");
            }
            if annotations.italic {
                content = format!("<em>{content}</em>");
            }
            if annotations.underline {
                content = format!("<u>{content}</u>");
            }
            if annotations.strikethrough {
                content = format!("<s>{content}</s>");
            }
            if annotations.code {
                content = format!("<code>{content}</code>");
            }

            if let Some(href) = span.href.as_deref().map(str::trim).filter(|h| !h.is_empty())
                && is_safe_href(href)
                && !self.is_internal_link(href, &span.plain_text)
            {
                content = format!(
                    "<a href=\"{}\" target=\"_blank\" rel=\"noopener noreferrer\">{content}</a>",
                    escape_html(href)
                );
            }
            html.push_str(&content);
        }
        html
    }

    /// Links into the same workspace, either by host or as a relative path that
    /// is not simply the visible text.
    pub fn is_internal_link(&self, href: &str, visible_text: &str) -> bool {
        let parsed = if href.starts_with("//") {
            Url::parse(&format!("https:{href}"))
        } else {
            Url::parse(href)
        };

        match parsed {
            Ok(url) => url.host_str().is_some_and(|host| self.is_workspace_host(host)),
            Err(url::ParseError::RelativeUrlWithoutBase) => href.trim() != visible_text.trim(),
            Err(_) => false,
        }
    }

    fn is_workspace_host(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();
        let matches = |domain: &str| host == domain || host.ends_with(&format!(".{domain}"));
        (!self.workspace_domain.is_empty() && matches(&self.workspace_domain))
            || matches("notion.site")
    }
}

/// Absolute links must use a web or mail scheme; relative links are kept.
fn is_safe_href(href: &str) -> bool {
    match Url::parse(href) {
        Ok(url) => matches!(url.scheme(), "http" | "https" | "mailto"),
        Err(url::ParseError::RelativeUrlWithoutBase) => true,
        Err(_) => false,
    }
}

fn is_blank(spans: &[RichText]) -> bool {
    spans.iter().all(|span| span.plain_text.trim().is_empty())
}

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(ch),
        }
    }
    out
}
