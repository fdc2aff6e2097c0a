use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::{Query, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

use crate::cover::{
    DEFAULT_DPR, DETAIL_COVER_HEIGHT, DETAIL_COVER_WIDTH, is_proxyable_source, proxied_image_url,
};
use crate::library::{Fetched, Library};
use crate::model::Shelf;

pub const CACHE_STATUS_HEADER: &str = "x-readshelf-cache";

#[derive(Clone)]
pub struct AppState {
    pub library: Arc<Library>,
}

impl AppState {
    pub fn new(library: Arc<Library>) -> Self {
        Self { library }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

type ApiError = (StatusCode, Json<ErrorBody>);

fn api_error(status: StatusCode, message: &str) -> ApiError {
    (
        status,
        Json(ErrorBody {
            message: message.to_owned(),
            error: None,
        }),
    )
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(|| async { "ok\n" }))
        .route(
            "/api/books",
            get(list_books_handler).fallback(method_not_allowed),
        )
        .route(
            "/api/notionPage",
            get(notion_page_handler).fallback(method_not_allowed),
        )
        .route("/api/cover", get(cover_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|err| anyhow::anyhow!("bind {addr}: {err}"))?;
    tracing::info!(%addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(%err, "listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

async fn method_not_allowed() -> ApiError {
    api_error(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BooksQuery {
    page_size: Option<String>,
    cursor: Option<String>,
    status: Option<String>,
}

async fn list_books_handler(
    State(state): State<AppState>,
    Query(q): Query<BooksQuery>,
) -> Result<Response, ApiError> {
    let shelf = match q.status.as_deref() {
        Some(raw) => Shelf::parse(raw)
            .map_err(|err| api_error(StatusCode::BAD_REQUEST, &format!("{err:#}")))?,
        None => Shelf::default(),
    };
    let page_size = q
        .page_size
        .as_deref()
        .and_then(|raw| raw.trim().parse::<usize>().ok());

    let outcome = state
        .library
        .list_books(shelf, page_size, q.cursor.as_deref())
        .await;

    let mut resp = Json(outcome.page).into_response();
    resp.headers_mut().insert(
        CACHE_STATUS_HEADER,
        HeaderValue::from_static(outcome.served.as_str()),
    );
    Ok(resp)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NotionPageQuery {
    page_id: Option<String>,
}

async fn notion_page_handler(
    State(state): State<AppState>,
    Query(q): Query<NotionPageQuery>,
) -> Result<Response, ApiError> {
    let Some(page_id) = q
        .page_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
    else {
        return Err(api_error(StatusCode::BAD_REQUEST, "Missing pageId parameter"));
    };
    if uuid::Uuid::parse_str(page_id).is_err() {
        return Err(api_error(StatusCode::BAD_REQUEST, "Invalid pageId parameter"));
    }

    // Dropping this handler (client went away) cancels the upstream fetch.
    let cancel = tokio_util::sync::CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    match state.library.page_content(page_id, &cancel).await {
        Ok(Fetched::Ready(content)) => Ok(Json(content).into_response()),
        Ok(Fetched::Cancelled) => Ok(StatusCode::NO_CONTENT.into_response()),
        Err(err) => {
            tracing::warn!(page_id, error = %format!("{err:#}"), "fetch notion page failed");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody {
                    message: "Failed to fetch Notion page".to_owned(),
                    error: Some(format!("{err:#}")),
                }),
            ))
        }
    }
}

#[derive(Debug, Deserialize)]
struct CoverQuery {
    src: Option<String>,
    w: Option<u32>,
    h: Option<u32>,
    dpr: Option<u32>,
}

async fn cover_handler(Query(q): Query<CoverQuery>) -> Result<Response, ApiError> {
    let src = q.src.as_deref().map(str::trim).unwrap_or_default();
    if !is_proxyable_source(src) {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "src must be an absolute http(s) URL",
        ));
    }
    let url = proxied_image_url(
        src,
        q.w.unwrap_or(DETAIL_COVER_WIDTH),
        q.h.unwrap_or(DETAIL_COVER_HEIGHT),
        q.dpr.unwrap_or(DEFAULT_DPR),
    )
    .ok_or_else(|| api_error(StatusCode::BAD_REQUEST, "src is required"))?;

    let location = HeaderValue::from_str(url.as_str())
        .map_err(|_| api_error(StatusCode::INTERNAL_SERVER_ERROR, "invalid proxy url"))?;
    let mut resp = Response::new(axum::body::Body::empty());
    *resp.status_mut() = StatusCode::TEMPORARY_REDIRECT;
    resp.headers_mut().insert(header::LOCATION, location);
    Ok(resp)
}
