//! Spring Data paging: request parameters and the page envelope.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Optional `page`/`size`/`sort` query parameters.
///
/// # Example
/// ```
/// use clinic_client::resources::Pageable;
///
/// let pageable = Pageable::new(0, 20).sort("createdAt,desc");
/// assert_eq!(
///     pageable.endpoint("/patients", &[]),
///     "/patients?page=0&size=20&sort=createdAt%2Cdesc"
/// );
/// assert_eq!(Pageable::default().endpoint("/patients", &[]), "/patients");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pageable {
    pub page: Option<u32>,
    pub size: Option<u32>,
    pub sort: Option<String>,
}

impl Pageable {
    pub fn new(page: u32, size: u32) -> Self {
        Self {
            page: Some(page),
            size: Some(size),
            sort: None,
        }
    }

    pub fn sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    /// `path` with `extra` pairs first, then the paging parameters.
    /// Pairs with empty values are skipped; no `?` when nothing remains.
    pub fn endpoint(&self, path: &str, extra: &[(&str, &str)]) -> String {
        let mut pairs: Vec<(&str, String)> = extra
            .iter()
            .filter(|(_, value)| !value.is_empty())
            .map(|(key, value)| (*key, (*value).to_string()))
            .collect();
        if let Some(page) = self.page {
            pairs.push(("page", page.to_string()));
        }
        if let Some(size) = self.size {
            pairs.push(("size", size.to_string()));
        }
        if let Some(sort) = self.sort.as_deref().filter(|s| !s.is_empty()) {
            pairs.push(("sort", sort.to_string()));
        }

        if pairs.is_empty() {
            return path.to_string();
        }
        let query = pairs
            .iter()
            .map(|(key, value)| {
                format!("{}={}", urlencoding::encode(key), urlencoding::encode(value))
            })
            .collect::<Vec<_>>()
            .join("&");
        format!("{path}?{query}")
    }
}

/// The Spring Data `Page` envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub content: Vec<T>,
    pub total_elements: u64,
    pub total_pages: u32,
    pub size: u32,
    pub number: u32,
    pub first: bool,
    pub last: bool,
    pub number_of_elements: u32,
    pub empty: bool,
    #[serde(default)]
    pub pageable: Value,
    #[serde(default)]
    pub sort: Value,
}

fn unsorted() -> Value {
    json!({ "empty": true, "sorted": false, "unsorted": true })
}

fn page_request(number: u32, size: u32) -> Value {
    json!({
        "pageNumber": number,
        "pageSize": size,
        "sort": unsorted(),
        "offset": u64::from(number) * u64::from(size),
        "paged": true,
        "unpaged": false,
    })
}

/// Coerce whatever a list endpoint returned into a [`Page`].
///
/// Accepts a full page, a bare array (wrapped as the only page) or any other
/// value, whose recognisable fields are kept and the rest defaulted.
pub fn normalize_page<T: DeserializeOwned>(
    value: Value,
    pageable: &Pageable,
) -> serde_json::Result<Page<T>> {
    match value {
        Value::Array(items) => {
            let content = items
                .into_iter()
                .map(serde_json::from_value)
                .collect::<serde_json::Result<Vec<T>>>()?;
            let len = count(content.len());
            let size = pageable.size.filter(|s| *s > 0).unwrap_or(len);
            let number = pageable.page.unwrap_or(0);
            Ok(Page {
                total_elements: u64::from(len),
                total_pages: 1,
                size,
                number,
                first: true,
                last: true,
                number_of_elements: len,
                empty: len == 0,
                pageable: page_request(number, size),
                sort: unsorted(),
                content,
            })
        }
        Value::Object(map) => coerce_object(map, pageable),
        _ => coerce_object(Map::new(), pageable),
    }
}

fn coerce_object<T: DeserializeOwned>(
    mut map: Map<String, Value>,
    pageable: &Pageable,
) -> serde_json::Result<Page<T>> {
    let content: Vec<T> = match map.remove("content") {
        Some(Value::Array(items)) => items
            .into_iter()
            .map(serde_json::from_value)
            .collect::<serde_json::Result<_>>()?,
        _ => Vec::new(),
    };
    let len = count(content.len());
    let int = |key: &str| map.get(key).and_then(Value::as_u64);
    let flag = |key: &str| map.get(key).and_then(Value::as_bool);

    let size = int("size")
        .map(saturate)
        .or(pageable.size)
        .unwrap_or(len);
    let number = int("number").map(saturate).or(pageable.page).unwrap_or(0);
    Ok(Page {
        total_elements: int("totalElements").unwrap_or(u64::from(len)),
        total_pages: int("totalPages").map(saturate).unwrap_or(1),
        size,
        number,
        first: flag("first").unwrap_or(true),
        last: flag("last").unwrap_or(true),
        number_of_elements: int("numberOfElements").map(saturate).unwrap_or(len),
        empty: flag("empty").unwrap_or(len == 0),
        pageable: map
            .get("pageable")
            .cloned()
            .unwrap_or_else(|| page_request(number, size)),
        sort: map.get("sort").cloned().unwrap_or_else(unsorted),
        content,
    })
}

fn count(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}

fn saturate(n: u64) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}
