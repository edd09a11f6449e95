use std::str::FromStr;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use tracing::error;

use catalog_repo::RepoError;
use catalog_types::{ProductFilter, DEFAULT_PAGE, DEFAULT_PAGE_SIZE};

use crate::response::{
    ApiError, Data, Paginated, CODE_CATEGORY_INVALID_ID, CODE_CATEGORY_NOT_FOUND,
    CODE_PRODUCT_INVALID_ID, CODE_PRODUCT_NOT_FOUND,
};
use crate::state::AppState;

/// Query string of `GET /api/v1/products`.
///
/// Everything is taken as text so a malformed number becomes our own
/// validation error rather than the extractor's rejection.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductQuery {
    pub name: Option<String>,
    /// Comma-separated.
    pub categories: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub page: Option<String>,
    pub page_size: Option<String>,
}

impl ProductQuery {
    pub fn into_filter(self) -> Result<ProductFilter, ApiError> {
        let categories = self
            .categories
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(String::from)
            .collect();
        let filter = ProductFilter {
            name: self.name.filter(|n| !n.is_empty()),
            categories,
            min_price: parse_param("minPrice", self.min_price)?,
            max_price: parse_param("maxPrice", self.max_price)?,
            page: parse_param("page", self.page)?.unwrap_or(DEFAULT_PAGE),
            page_size: parse_param("pageSize", self.page_size)?.unwrap_or(DEFAULT_PAGE_SIZE),
        };
        filter
            .validate()
            .map_err(|e| ApiError::validation(e.to_string()))?;
        Ok(filter)
    }
}

fn parse_param<T: FromStr>(name: &str, raw: Option<String>) -> Result<Option<T>, ApiError> {
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| ApiError::validation(format!("{name}: not a number: {value:?}"))),
    }
}

/// Map a service failure onto the error envelope.
fn failure(err: RepoError, not_found_code: &'static str) -> ApiError {
    match err {
        err if err.is_not_found() => ApiError::not_found(not_found_code, err.to_string()),
        RepoError::Invalid(e) => ApiError::validation(e.to_string()),
        err => {
            error!(error = %err, "request failed");
            ApiError::internal()
        }
    }
}

/// `GET /ping`
pub async fn ping() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/plain")], ".")
}

/// `GET /api/v1/products`
pub async fn list_products(
    State(state): State<AppState>,
    query: Result<Query<ProductQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::validation(e.body_text()))?;
    let filter = query.into_filter()?;
    let (page, page_size) = (filter.page, filter.page_size);

    let result = state
        .products
        .get_all(state.context(), filter)
        .await
        .map_err(|e| failure(e, CODE_PRODUCT_NOT_FOUND))?;

    if result.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }
    Ok(Json(Paginated {
        data: result.items,
        total_count: result.total,
        page,
        page_size,
    })
    .into_response())
}

/// `GET /api/v1/products/:id`
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    if id.trim().is_empty() {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            CODE_PRODUCT_INVALID_ID,
            "product ID is required",
        ));
    }
    let product = state
        .products
        .get_by_id(state.context(), id)
        .await
        .map_err(|e| failure(e, CODE_PRODUCT_NOT_FOUND))?;
    Ok(Json(Data { data: product }).into_response())
}

/// `GET /api/v1/categories`
pub async fn list_categories(State(state): State<AppState>) -> Result<Response, ApiError> {
    let categories = state
        .categories
        .get_all(state.context())
        .await
        .map_err(|e| failure(e, CODE_CATEGORY_NOT_FOUND))?;
    if categories.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }
    Ok(Json(Data { data: categories }).into_response())
}

/// `GET /api/v1/categories/:name`
pub async fn get_category(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Response, ApiError> {
    if name.trim().is_empty() {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            CODE_CATEGORY_INVALID_ID,
            "category name is required",
        ));
    }
    let category = state
        .categories
        .get_by_name(state.context(), name)
        .await
        .map_err(|e| failure(e, CODE_CATEGORY_NOT_FOUND))?;
    Ok(Json(Data { data: category }).into_response())
}
