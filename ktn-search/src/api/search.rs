//! Order search
//!
//! `GET /search?search=<q>&searchType=byInscription|byCustomer&wholePhrase=<any>&page=<n>&limit=<n>`
//!
//! Inscription search matches the upper-cased `search` column; by default any
//! word of the query is enough, with `wholePhrase` the query must appear as
//! one substring. Customer search is a case-insensitive substring match on
//! the customer link. Results are newest partition first.

use axum::{
    extract::{Query, State},
    Json,
};
use ktn_common::db::{OrderRecord, SearchFilter};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::pagination::{calculate_pagination, clamp_page_size};
use crate::AppState;

/// Query parameters of `/search`.
///
/// Numbers are taken as text so a malformed `page` or `limit` falls back to
/// its default instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub search: String,

    #[serde(rename = "searchType")]
    pub search_type: Option<String>,

    /// Any non-empty value enables whole-phrase matching
    #[serde(rename = "wholePhrase")]
    pub whole_phrase: Option<String>,

    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchType {
    ByInscription,
    ByCustomer,
}

impl SearchType {
    fn parse(value: Option<&str>) -> Result<Self, ApiError> {
        match value.map(str::trim) {
            None | Some("") | Some("byInscription") => Ok(SearchType::ByInscription),
            Some("byCustomer") => Ok(SearchType::ByCustomer),
            Some(other) => Err(ApiError::BadRequest(format!("Unknown search type: {}", other))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SearchType::ByInscription => "byInscription",
            SearchType::ByCustomer => "byCustomer",
        }
    }
}

impl SearchParams {
    fn whole_phrase(&self) -> bool {
        self.whole_phrase
            .as_deref()
            .map_or(false, |v| !v.trim().is_empty())
    }

    fn number(value: Option<&str>) -> Option<i64> {
        value.and_then(|v| v.trim().parse().ok())
    }
}

/// Search response with results and metadata
#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub search_type: String,
    pub query: String,
    pub total_results: i64,
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
    pub orders: Vec<OrderRecord>,
}

/// GET /search
pub async fn search_orders(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ApiError> {
    let query = params.search.trim().to_string();
    if query.is_empty() {
        return Err(ApiError::BadRequest("Empty search query".to_string()));
    }

    let search_type = SearchType::parse(params.search_type.as_deref())?;
    let filter = match search_type {
        SearchType::ByInscription => SearchFilter::Inscription {
            term: query.clone(),
            whole_phrase: params.whole_phrase(),
        },
        SearchType::ByCustomer => SearchFilter::Customer {
            term: query.clone(),
        },
    };

    let page_size = clamp_page_size(SearchParams::number(params.limit.as_deref()));
    let requested_page = SearchParams::number(params.page.as_deref()).unwrap_or(1);

    let total_results = state.store.count_matching(&filter).await?;
    let pagination = calculate_pagination(total_results, requested_page, page_size);
    let orders = state
        .store
        .find_matching(&filter, page_size, pagination.offset)
        .await?;

    tracing::debug!(
        search_type = search_type.as_str(),
        query = %query,
        total_results,
        page = pagination.page,
        "Search served"
    );

    Ok(Json(SearchResponse {
        search_type: search_type.as_str().to_string(),
        query,
        total_results,
        page: pagination.page,
        page_size,
        total_pages: pagination.total_pages,
        orders,
    }))
}
