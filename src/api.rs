//! Wire types and the HTTP page source.
//!
//! The listing endpoint speaks plain GET with `limit`/`skip` paging plus
//! free-form `<field>=<text>` filter parameters, answering
//! `{ "total": n, "products": [...] }`. Records are opaque JSON objects;
//! the table reads them by field name for display only.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;
use url::Url;

use crate::domain::{LtvError, PageSize};

/// One product row as the server sent it. Fields are pass-through data keyed
/// by the column catalog; nothing here is validated beyond being an object.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct ProductRecord {
    fields: Map<String, Value>,
}

impl ProductRecord {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Display text for one field. Missing and null fields render as "∅",
    /// embedded line breaks are flattened so a cell stays one line.
    pub fn field_text(&self, field: &str) -> String {
        match self.fields.get(field) {
            None | Some(Value::Null) => String::from("∅"),
            Some(Value::String(s)) => s.replace("\r\n", " ↵ ").replace('\n', " ↵ "),
            Some(other) => other.to_string(),
        }
    }
}

/// Server answer for one fetch window.
#[derive(Debug, Clone, Deserialize)]
pub struct PageResponse {
    pub total: usize,
    pub products: Vec<ProductRecord>,
}

/// Wire-level query for one fetch: paging plus the active filters, already
/// in serialization order.
#[derive(Debug, Clone, PartialEq)]
pub struct PageQuery {
    pub limit: usize,
    pub skip: usize,
    pub filters: Vec<(String, String)>,
}

/// One staged fetch: the slot range it populates and the query that loads it.
#[derive(Debug, Clone)]
pub struct FetchWindow {
    pub first: usize,
    pub rows: PageSize,
    pub query: PageQuery,
}

/// What came back for a dispatched window.
#[derive(Debug)]
pub struct FetchOutcome {
    pub window: FetchWindow,
    pub result: Result<PageResponse, LtvError>,
    pub elapsed_ms: u128,
}

/// Seam between the table and whatever serves its pages. The HTTP source
/// below is the real one; tests substitute an in-memory fake.
#[async_trait]
pub trait ProductSource: Send + Sync {
    async fn fetch_page(&self, query: &PageQuery) -> Result<PageResponse, LtvError>;
}

pub struct HttpProductSource {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpProductSource {
    pub fn new(base_url: Url) -> Self {
        HttpProductSource {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    /// Request URL for a query: `limit` and `skip` first, then the filters
    /// in catalog order.
    pub fn page_url(&self, query: &PageQuery) -> Url {
        let mut url = self.base_url.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("limit", &query.limit.to_string());
            pairs.append_pair("skip", &query.skip.to_string());
            for (field, text) in &query.filters {
                pairs.append_pair(field, text);
            }
        }
        url
    }
}

#[async_trait]
impl ProductSource for HttpProductSource {
    async fn fetch_page(&self, query: &PageQuery) -> Result<PageResponse, LtvError> {
        let url = self.page_url(query);
        debug!("GET {url} ...");

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(LtvError::Api { status, message });
        }

        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn source() -> HttpProductSource {
        HttpProductSource::new(Url::parse("http://localhost/products").unwrap())
    }

    #[test]
    fn page_url_serializes_window_then_filters() {
        let query = PageQuery {
            limit: 10,
            skip: 20,
            filters: vec![("category".to_string(), "beauty".to_string())],
        };
        assert_eq!(
            source().page_url(&query).as_str(),
            "http://localhost/products?limit=10&skip=20&category=beauty"
        );
    }

    #[test]
    fn page_url_escapes_filter_text() {
        let query = PageQuery {
            limit: 15,
            skip: 0,
            filters: vec![("title".to_string(), "Essence Mascara".to_string())],
        };
        let url = source().page_url(&query);
        assert_eq!(
            url.as_str(),
            "http://localhost/products?limit=15&skip=0&title=Essence+Mascara"
        );
    }

    #[test]
    fn response_parses_total_and_products() {
        let body = r#"{
            "products": [
                {"id": 1, "title": "Essence Mascara", "category": "beauty"},
                {"id": 2, "title": "Eyeshadow Palette", "category": "beauty"}
            ],
            "total": 194,
            "skip": 0,
            "limit": 2
        }"#;
        let page: PageResponse = serde_json::from_str(body).unwrap();
        assert_eq!(page.total, 194);
        assert_eq!(page.products.len(), 2);
        assert_eq!(page.products[1].field_text("title"), "Eyeshadow Palette");
    }

    #[test]
    fn field_text_covers_the_odd_cases() {
        let record: ProductRecord = serde_json::from_value(json!({
            "id": 7,
            "title": "Two\nLines",
            "brand": null
        }))
        .unwrap();
        assert_eq!(record.field_text("id"), "7");
        assert_eq!(record.field_text("title"), "Two ↵ Lines");
        assert_eq!(record.field_text("brand"), "∅");
        assert_eq!(record.field_text("category"), "∅");
    }
}
