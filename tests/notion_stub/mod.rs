#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use serde_json::{Value, json};

pub const API_KEY: &str = "test-key";
pub const DATABASE_ID: &str = "db-books";
pub const PAGE_ID: &str = "0f1e2d3c-0000-4000-8000-000000000001";

#[derive(Debug, Clone, Default)]
pub struct NotionStubConfig {
    /// Delay before answering page and block requests.
    pub content_delay: Option<Duration>,
    /// Upper bound on results per query, below whatever the client asks for.
    pub max_page_size: Option<usize>,
}

#[derive(Debug, Default)]
pub struct Counters {
    pub queries: AtomicUsize,
    pub pages: AtomicUsize,
    pub blocks: AtomicUsize,
    pub fail_queries: AtomicBool,
}

impl Counters {
    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub fn pages(&self) -> usize {
        self.pages.load(Ordering::SeqCst)
    }

    pub fn blocks(&self) -> usize {
        self.blocks.load(Ordering::SeqCst)
    }

    pub fn set_fail_queries(&self, fail: bool) {
        self.fail_queries.store(fail, Ordering::SeqCst);
    }
}

pub struct NotionStub {
    pub base_url: String,
    pub counters: Arc<Counters>,
    shutdown_tx: Option<mpsc::Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl NotionStub {
    pub fn spawn(config: NotionStubConfig) -> Self {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("start notion stub server");
        let addr = server.server_addr();
        let base_url = format!("http://{addr}/v1");

        let counters = Arc::new(Counters::default());
        let thread_counters = Arc::clone(&counters);
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let handle = thread::spawn(move || {
            loop {
                if shutdown_rx.try_recv().is_ok() {
                    break;
                }

                let mut request = match server.recv_timeout(Duration::from_millis(50)) {
                    Ok(Some(req)) => req,
                    Ok(None) => continue,
                    Err(_) => break,
                };

                let authorized = request.headers().iter().any(|h| {
                    h.field.equiv("Authorization") && h.value.as_str() == format!("Bearer {API_KEY}")
                });
                if !authorized {
                    respond_json(
                        request,
                        401,
                        json!({ "object": "error", "status": 401, "code": "unauthorized", "message": "API token is invalid." }),
                    );
                    continue;
                }

                let url = request.url().to_string();
                let path = url.split('?').next().unwrap_or(&url).to_string();
                let method = request.method().clone();

                if method == tiny_http::Method::Post
                    && path == format!("/v1/databases/{DATABASE_ID}/query")
                {
                    thread_counters.queries.fetch_add(1, Ordering::SeqCst);
                    if thread_counters.fail_queries.load(Ordering::SeqCst) {
                        respond_json(
                            request,
                            503,
                            json!({ "object": "error", "status": 503, "code": "service_unavailable", "message": "try later" }),
                        );
                        continue;
                    }
                    let mut body = String::new();
                    if request.as_reader().read_to_string(&mut body).is_err() {
                        respond_json(request, 400, json!({ "message": "invalid body" }));
                        continue;
                    }
                    let parsed: Value = serde_json::from_str(&body).unwrap_or(Value::Null);
                    respond_json(request, 200, query_response(&parsed, config.max_page_size));
                    continue;
                }

                if method == tiny_http::Method::Get && path == format!("/v1/pages/{PAGE_ID}") {
                    thread_counters.pages.fetch_add(1, Ordering::SeqCst);
                    if let Some(delay) = config.content_delay {
                        thread::sleep(delay);
                    }
                    respond_json(request, 200, page_response());
                    continue;
                }

                if method == tiny_http::Method::Get
                    && path == format!("/v1/blocks/{PAGE_ID}/children")
                {
                    thread_counters.blocks.fetch_add(1, Ordering::SeqCst);
                    respond_json(request, 200, blocks_response());
                    continue;
                }

                respond_json(
                    request,
                    404,
                    json!({ "object": "error", "status": 404, "code": "object_not_found", "message": format!("no route for {path}") }),
                );
            }
        });

        Self {
            base_url,
            counters,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }
}

impl Drop for NotionStub {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn respond_json(request: tiny_http::Request, status: u16, body: Value) {
    let header = tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
        .expect("build header");
    let response = tiny_http::Response::from_string(body.to_string())
        .with_status_code(status)
        .with_header(header);
    let _ = request.respond(response);
}

fn book_page(index: usize) -> Value {
    let title = if index == 0 {
        json!([])
    } else {
        json!([ { "type": "text", "plain_text": format!("Book {index}") } ])
    };
    json!({
        "object": "page",
        "id": format!("book-{index}"),
        "properties": {
            "名称": { "type": "title", "title": title },
            "创作者": { "type": "multi_select", "multi_select": [ { "name": format!("Author {index}") } ] },
            "分类": { "type": "formula", "formula": { "type": "string", "string": "文学" } },
            "URL": { "type": "url", "url": format!("https://book.example/{index}") },
            "封面 URL": { "type": "url", "url": null },
            "状态": { "type": "select", "select": { "name": "完成" } },
            "评价": { "type": "select", "select": { "name": "好" } },
            "评价日期": { "type": "date", "date": { "start": format!("2024-03-{:02}", 10 + index) } }
        }
    })
}

pub const TOTAL_BOOKS: usize = 5;

fn query_response(body: &Value, max_page_size: Option<usize>) -> Value {
    let requested = body
        .get("page_size")
        .and_then(Value::as_u64)
        .unwrap_or(100) as usize;
    let page_size = max_page_size.map_or(requested, |max| requested.min(max));
    let offset = body
        .get("start_cursor")
        .and_then(Value::as_str)
        .and_then(|c| c.strip_prefix("cursor-"))
        .and_then(|n| n.parse::<usize>().ok())
        .unwrap_or(0);

    let end = (offset + page_size).min(TOTAL_BOOKS);
    let results = (offset..end).map(book_page).collect::<Vec<_>>();
    let has_more = end < TOTAL_BOOKS;
    json!({
        "object": "list",
        "results": results,
        "has_more": has_more,
        "next_cursor": if has_more { Value::String(format!("cursor-{end}")) } else { Value::Null },
    })
}

fn page_response() -> Value {
    json!({
        "object": "page",
        "id": PAGE_ID,
        "properties": {
            "名称": { "type": "title", "title": [ { "type": "text", "plain_text": "三体" } ] }
        }
    })
}

fn blocks_response() -> Value {
    json!({
        "object": "list",
        "has_more": false,
        "next_cursor": null,
        "results": [
            {
                "id": "b1", "type": "heading_1", "has_children": false,
                "heading_1": { "rich_text": [ { "type": "text", "plain_text": "Notes" } ] }
            },
            {
                "id": "b2", "type": "paragraph", "has_children": false,
                "paragraph": { "rich_text": [] }
            },
            {
                "id": "b3", "type": "paragraph", "has_children": false,
                "paragraph": { "rich_text": [
                    { "type": "text", "plain_text": "<script>x</script>",
                      "annotations": { "bold": true, "italic": false, "strikethrough": false, "underline": false, "code": false } }
                ] }
            },
            {
                "id": "b4", "type": "table", "has_children": true, "table": { "table_width": 2 }
            },
            { "id": "b5", "type": "divider", "has_children": false, "divider": {} }
        ]
    })
}
