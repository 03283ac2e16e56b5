//! Danawa product API response parsing
//!
//! Successful responses are JSON. Failures come back as an XML envelope with
//! `<code>` and `<message>` elements, or as arbitrary text.

use chrono::NaiveDateTime;
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

const INPUT_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const LARGE_IMAGE_NAME: &str = "large_1";

/// Outcome of interpreting a Danawa response body
#[derive(Debug, Clone, PartialEq)]
pub enum DanawaResponse<T> {
    Data(T),
    /// The API answered with an XML error envelope
    RemoteError { code: String, message: String },
    InvalidXml,
    Unrecognized,
}

impl<T> DanawaResponse<T> {
    /// Log non-data outcomes and return the data, if any
    pub fn into_data(self) -> Option<T> {
        match self {
            Self::Data(data) => Some(data),
            Self::RemoteError { code, message } => {
                warn!("Danawa responded with an error: {}: {}", code, message);
                None
            }
            Self::InvalidXml => {
                warn!("Danawa responded with an invalid XML");
                None
            }
            Self::Unrecognized => {
                warn!("Danawa responded with an incomprehensible text");
                None
            }
        }
    }
}

/// Price-related fields of a product info response
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProductInfo {
    /// Lowest price; 0 when unknown
    pub min_price: i64,
    /// Number of shops selling the product; 0 when unknown
    pub shop_count: i64,
    pub input_date: Option<NaiveDateTime>,
    pub large_image_url: Option<String>,
}

/// One hit of a product search
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductSearchHit {
    pub maker: String,
    pub prod_name: String,
    pub prod_id: String,
    pub min_price: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ProductSearchResults {
    pub total_count: i64,
    pub products: Vec<ProductSearchHit>,
}

pub fn parse_product_info(body: &str) -> DanawaResponse<ProductInfo> {
    parse_json_or_envelope(body).map_data(|value| ProductInfo {
        min_price: json_int(value.get("minPrice")),
        shop_count: json_int(value.get("shopCount")),
        input_date: value
            .get("inputDate")
            .and_then(Value::as_str)
            .and_then(|s| NaiveDateTime::parse_from_str(s.trim(), INPUT_DATE_FORMAT).ok()),
        large_image_url: large_image_url(&value),
    })
}

pub fn parse_search_results(body: &str) -> DanawaResponse<ProductSearchResults> {
    parse_json_or_envelope(body).map_data(|value| {
        // A single hit is returned as an object rather than a one-element list
        let products = match value.get("productList") {
            Some(Value::Array(items)) => items.iter().map(search_hit).collect(),
            Some(item @ Value::Object(_)) => vec![search_hit(item)],
            _ => Vec::new(),
        };
        ProductSearchResults {
            total_count: json_int(value.get("totalCount")),
            products,
        }
    })
}

impl<T> DanawaResponse<T> {
    fn map_data<U>(self, f: impl FnOnce(T) -> U) -> DanawaResponse<U> {
        match self {
            Self::Data(data) => DanawaResponse::Data(f(data)),
            Self::RemoteError { code, message } => DanawaResponse::RemoteError { code, message },
            Self::InvalidXml => DanawaResponse::InvalidXml,
            Self::Unrecognized => DanawaResponse::Unrecognized,
        }
    }
}

fn parse_json_or_envelope(body: &str) -> DanawaResponse<Value> {
    match serde_json::from_str::<Value>(body) {
        Ok(value) => DanawaResponse::Data(value),
        Err(_) if body.starts_with("<?xml") => parse_error_envelope(body),
        Err(_) => DanawaResponse::Unrecognized,
    }
}

/// Read `<code>` and `<message>` from an XML error envelope
fn parse_error_envelope(body: &str) -> DanawaResponse<Value> {
    let mut reader = Reader::from_str(body);
    reader.config_mut().trim_text(true);

    let mut current: Option<String> = None;
    let mut code = None;
    let mut message = None;
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                current = Some(String::from_utf8_lossy(e.name().as_ref()).into_owned());
            }
            Ok(Event::Text(e)) => {
                let Ok(text) = e.unescape() else {
                    return DanawaResponse::InvalidXml;
                };
                match current.as_deref() {
                    Some("code") if code.is_none() => code = Some(text.into_owned()),
                    Some("message") if message.is_none() => message = Some(text.into_owned()),
                    _ => {}
                }
            }
            Ok(Event::End(_)) => current = None,
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(_) => return DanawaResponse::InvalidXml,
        }
    }

    match (code, message) {
        (Some(code), Some(message)) => DanawaResponse::RemoteError { code, message },
        _ => DanawaResponse::InvalidXml,
    }
}

/// Integer from a JSON number or numeric string; anything else counts as 0
fn json_int(value: Option<&Value>) -> i64 {
    match value {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)).unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

fn json_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn large_image_url(value: &Value) -> Option<String> {
    let images = value.get("images")?.get("image")?;
    let candidates: Vec<&Value> = match images {
        Value::Array(items) => items.iter().collect(),
        item @ Value::Object(_) => vec![item],
        _ => return None,
    };
    candidates
        .into_iter()
        .find(|image| image.get("name").and_then(Value::as_str) == Some(LARGE_IMAGE_NAME))
        .and_then(|image| image.get("url"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn search_hit(value: &Value) -> ProductSearchHit {
    ProductSearchHit {
        maker: json_text(value.get("maker")),
        prod_name: json_text(value.get("prod_name")),
        prod_id: json_text(value.get("prod_id")),
        min_price: json_text(value.get("min_price")),
    }
}
