//! List filtering and limit/offset pagination.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::error::{FieldErrorKind, ProductError, ProductResult};
use crate::models::Product;
use crate::serializer::ProductView;

pub const DEFAULT_PAGE_SIZE: u64 = 10;
pub const MAX_PAGE_SIZE: u64 = 100;

/// Raw list query parameters, kept as strings so bad values can fall back
/// to defaults instead of rejecting the request.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListParams {
    /// Exact product id
    pub id: Option<String>,
    /// Terms separated by whitespace or commas; each must match name or description
    pub search: Option<String>,
    /// `true` (any case) keeps only products currently on sale; any other value is ignored
    pub on_sale: Option<String>,
    /// Page size, default 10, at most 100
    pub limit: Option<String>,
    /// Number of products to skip
    pub offset: Option<String>,
}

impl ListParams {
    /// Builds params from decoded query pairs; a repeated key keeps its last value.
    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        let mut params = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "id" => &mut params.id,
                "search" => &mut params.search,
                "on_sale" => &mut params.on_sale,
                "limit" => &mut params.limit,
                "offset" => &mut params.offset,
                _ => continue,
            };
            *slot = Some(value.clone());
        }
        params
    }
}

/// Normalized list query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductQuery {
    pub id: Option<i64>,
    /// Lowercased search terms, all of which must match
    pub search_terms: Vec<String>,
    pub on_sale_only: bool,
    pub limit: u64,
    pub offset: u64,
}

impl Default for ProductQuery {
    fn default() -> Self {
        Self {
            id: None,
            search_terms: Vec::new(),
            on_sale_only: false,
            limit: DEFAULT_PAGE_SIZE,
            offset: 0,
        }
    }
}

impl ProductQuery {
    pub fn from_params(params: &ListParams) -> ProductResult<Self> {
        let id = match params.id.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(raw.parse::<i64>().map_err(|_| {
                ProductError::field("id", FieldErrorKind::InvalidNumber, "Enter a number.")
            })?),
        };

        Ok(Self {
            id,
            search_terms: params
                .search
                .as_deref()
                .map(split_search_terms)
                .unwrap_or_default(),
            on_sale_only: params
                .on_sale
                .as_deref()
                .is_some_and(|v| v.to_lowercase() == "true"),
            limit: parse_limit(params.limit.as_deref()),
            offset: parse_offset(params.offset.as_deref()),
        })
    }

    /// Whether `product` passes the id, sale and search filters.
    pub fn matches(&self, product: &Product, now: DateTime<Utc>) -> bool {
        if self.id.is_some_and(|id| id != product.id) {
            return false;
        }
        if self.on_sale_only && !product.is_on_sale(now) {
            return false;
        }
        if self.search_terms.is_empty() {
            return true;
        }

        let name = product.name.to_lowercase();
        let description = product.description.to_lowercase();
        self.search_terms
            .iter()
            .all(|term| name.contains(term.as_str()) || description.contains(term.as_str()))
    }
}

fn split_search_terms(raw: &str) -> Vec<String> {
    raw.replace('\0', "")
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|term| !term.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn parse_limit(raw: Option<&str>) -> u64 {
    match raw.and_then(|v| v.trim().parse::<i64>().ok()) {
        Some(limit) if limit > 0 => (limit as u64).min(MAX_PAGE_SIZE),
        _ => DEFAULT_PAGE_SIZE,
    }
}

fn parse_offset(raw: Option<&str>) -> u64 {
    match raw.and_then(|v| v.trim().parse::<i64>().ok()) {
        Some(offset) if offset > 0 => offset as u64,
        _ => 0,
    }
}

/// `%term%` for a `LIKE` match with the default backslash escape.
pub(crate) fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// One page of the product list.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProductPage {
    /// Total number of matching products
    pub count: u64,
    #[schema(example = "/api/v1/products?limit=10&offset=10")]
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<ProductView>,
}

impl ProductPage {
    /// `path` and `pairs` describe the request; links keep every parameter
    /// except `limit` and `offset`, which are rewritten.
    pub fn new(
        count: u64,
        results: Vec<ProductView>,
        query: &ProductQuery,
        path: &str,
        pairs: &[(String, String)],
    ) -> Self {
        let next = (query.offset + query.limit < count)
            .then(|| page_link(path, pairs, query.limit, Some(query.offset + query.limit)));

        let previous = if query.offset == 0 {
            None
        } else if query.offset <= query.limit {
            Some(page_link(path, pairs, query.limit, None))
        } else {
            Some(page_link(
                path,
                pairs,
                query.limit,
                Some(query.offset - query.limit),
            ))
        };

        Self {
            count,
            next,
            previous,
            results,
        }
    }
}

fn page_link(path: &str, pairs: &[(String, String)], limit: u64, offset: Option<u64>) -> String {
    let mut params: Vec<(String, String)> = pairs
        .iter()
        .filter(|(key, _)| key != "limit" && key != "offset")
        .cloned()
        .collect();
    params.push(("limit".to_string(), limit.to_string()));
    if let Some(offset) = offset {
        params.push(("offset".to_string(), offset.to_string()));
    }
    params.sort_by(|a, b| a.0.cmp(&b.0));

    let query = params
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");

    format!("{}?{}", path, query)
}
