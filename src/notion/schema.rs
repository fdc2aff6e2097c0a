use chrono::{DateTime, FixedOffset, NaiveDate};
use serde_json::{Value, json};

use crate::model::{BookRecord, BookStatus, Shelf, UNTITLED};

pub const PROP_NAME: &str = "名称";
pub const PROP_AUTHORS: &str = "创作者";
pub const PROP_CATEGORY: &str = "分类";
pub const PROP_URL: &str = "URL";
pub const PROP_COVER_URL: &str = "封面 URL";
pub const PROP_STATUS: &str = "状态";
pub const PROP_RATING: &str = "评价";
pub const PROP_RATING_DATE: &str = "评价日期";
pub const PROP_FORMAT: &str = "形式";
pub const FORMAT_BOOK: &str = "书";

type Extractor = fn(&mut BookRecord, &Value);

/// Property name paired with the function that copies it into a record.
/// A property that is missing or of the wrong type leaves the default in place.
const BOOK_FIELDS: &[(&str, Extractor)] = &[
    (PROP_NAME, set_name),
    (PROP_AUTHORS, set_authors),
    (PROP_CATEGORY, set_category),
    (PROP_URL, set_url),
    (PROP_COVER_URL, set_cover_url),
    (PROP_STATUS, set_status),
    (PROP_RATING, set_rating),
    (PROP_RATING_DATE, set_rating_date),
];

fn set_name(book: &mut BookRecord, prop: &Value) {
    if let Some(name) = first_title_text(prop) {
        book.name = name;
    }
}

fn set_authors(book: &mut BookRecord, prop: &Value) {
    book.authors = multi_select_names(prop);
}

fn set_category(book: &mut BookRecord, prop: &Value) {
    if let Some(category) = formula_string(prop) {
        book.category = category;
    }
}

fn set_url(book: &mut BookRecord, prop: &Value) {
    book.url = url_value(prop);
}

fn set_cover_url(book: &mut BookRecord, prop: &Value) {
    book.cover_url = url_value(prop);
}

fn set_status(book: &mut BookRecord, prop: &Value) {
    book.status = select_name(prop)
        .map(|label| BookStatus::from_label(&label))
        .unwrap_or(BookStatus::None);
}

fn set_rating(book: &mut BookRecord, prop: &Value) {
    book.rating = select_name(prop);
}

fn set_rating_date(book: &mut BookRecord, prop: &Value) {
    book.rating_date = date_start(prop).and_then(|raw| parse_date(&raw));
}

/// Maps one database page object into a [`BookRecord`].
///
/// Returns `None` only when the object carries no `properties` at all.
pub fn book_from_page(page: &Value) -> Option<BookRecord> {
    let properties = page.get("properties")?.as_object()?;
    let id = page.get("id").and_then(Value::as_str).map(str::to_owned);

    let mut book = BookRecord::untitled(id);
    for (name, extract) in BOOK_FIELDS {
        if let Some(prop) = properties.get(*name) {
            extract(&mut book, prop);
        }
    }
    Some(book)
}

/// Body for the database query: books only, restricted to the shelf's status
/// labels, newest rating date first.
pub fn query_body(shelf: Shelf, page_size: usize, cursor: Option<&str>) -> Value {
    let status_conditions = shelf
        .labels()
        .iter()
        .map(|label| json!({ "property": PROP_STATUS, "select": { "equals": label } }))
        .collect::<Vec<_>>();

    let mut body = json!({
        "page_size": page_size,
        "filter": {
            "and": [
                { "property": PROP_FORMAT, "multi_select": { "contains": FORMAT_BOOK } },
                { "or": status_conditions },
            ]
        },
        "sorts": [
            { "property": PROP_RATING_DATE, "direction": "descending" }
        ],
    });
    if let Some(cursor) = cursor.map(str::trim).filter(|c| !c.is_empty())
        && let Some(obj) = body.as_object_mut()
    {
        obj.insert("start_cursor".to_owned(), json!(cursor));
    }
    body
}

/// Title of a standalone page: `title`, then `Name`, then any title-typed property.
pub fn page_title(page: &Value) -> String {
    let Some(properties) = page.get("properties").and_then(Value::as_object) else {
        return UNTITLED.to_owned();
    };

    ["title", "Name"]
        .iter()
        .filter_map(|name| properties.get(*name))
        .chain(
            properties
                .values()
                .filter(|prop| prop.get("type").and_then(Value::as_str) == Some("title")),
        )
        .find_map(first_title_text)
        .unwrap_or_else(|| UNTITLED.to_owned())
}

/// Accepts `YYYY-MM-DD` (midnight UTC) or a full RFC 3339 timestamp.
pub fn parse_date(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    if let Ok(date) = DateTime::parse_from_rfc3339(raw) {
        return Some(date);
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?;
    let utc = FixedOffset::east_opt(0)?;
    date.and_hms_opt(0, 0, 0)?.and_local_timezone(utc).single()
}

fn typed<'a>(prop: &'a Value, kind: &str) -> Option<&'a Value> {
    if prop.get("type").and_then(Value::as_str) != Some(kind) {
        return None;
    }
    prop.get(kind).filter(|v| !v.is_null())
}

fn first_title_text(prop: &Value) -> Option<String> {
    let first = typed(prop, "title")?.as_array()?.first()?;
    first
        .get("plain_text")
        .and_then(Value::as_str)
        .filter(|text| !text.trim().is_empty())
        .map(str::to_owned)
}

fn multi_select_names(prop: &Value) -> Vec<String> {
    typed(prop, "multi_select")
        .and_then(Value::as_array)
        .map(|options| {
            options
                .iter()
                .filter_map(|option| option.get("name").and_then(Value::as_str))
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default()
}

fn formula_string(prop: &Value) -> Option<String> {
    let formula = typed(prop, "formula")?;
    if formula.get("type").and_then(Value::as_str) != Some("string") {
        return None;
    }
    formula.get("string")?.as_str().map(str::to_owned)
}

fn url_value(prop: &Value) -> Option<String> {
    typed(prop, "url")?
        .as_str()
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(str::to_owned)
}

fn select_name(prop: &Value) -> Option<String> {
    typed(prop, "select")?
        .get("name")?
        .as_str()
        .map(str::to_owned)
}

fn date_start(prop: &Value) -> Option<String> {
    typed(prop, "date")?
        .get("start")?
        .as_str()
        .map(str::to_owned)
}
