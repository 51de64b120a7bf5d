//! Published project reads.
//!
//! Rows come back from the pool as JSON objects with their column names as
//! stored; the route's normalizer rewrites keys for clients.

use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use serde_json::json;

use crate::api::dto::pagination::PaginationParams;
use crate::api::reply::Reply;
use crate::error::AppError;
use crate::infrastructure::persistence::SqlParam;
use crate::state::AppState;

const MAX_SLUG_LEN: usize = 200;

const LIST_PUBLISHED: &str = "SELECT id, slug, title, summary, cover_image_url, \
     published_at, updated_at \
     FROM projects WHERE published = true \
     ORDER BY published_at DESC NULLS LAST, id DESC \
     LIMIT $1 OFFSET $2";

const FIND_PUBLISHED: &str = "SELECT id, slug, title, summary, body, cover_image_url, tags, \
     published_at, updated_at \
     FROM projects WHERE slug = $1 AND published = true \
     LIMIT 1";

/// Lists published projects, newest first.
///
/// # Endpoint
///
/// `GET /api/projects?page=1&page_size=20`
///
/// # Errors
///
/// - **400 Bad Request**: unparsable or invalid pagination
/// - **500 Internal Server Error**: database failure
pub async fn list_projects_handler(
    State(state): State<AppState>,
    query: Result<Query<PaginationParams>, QueryRejection>,
) -> Result<Reply, AppError> {
    let Query(params) = query?;
    let page = params.validate().map_err(AppError::bad_request)?;

    let items = state
        .pool
        .query_json(LIST_PUBLISHED, &[SqlParam::from(page.limit()), SqlParam::from(page.offset())])
        .await?;

    Ok(Reply::ok(json!({
        "items": items,
        "page": page.page,
        "page_size": page.page_size,
    })))
}

/// Returns one published project.
///
/// # Endpoint
///
/// `GET /api/projects/{slug}`
///
/// # Errors
///
/// - **400 Bad Request**: malformed slug
/// - **404 Not Found**: no published project with that slug
pub async fn project_handler(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> Result<Reply, AppError> {
    let Path(slug) = path?;
    if !is_valid_slug(&slug) {
        return Err(AppError::bad_request("Invalid project slug"));
    }

    let mut rows = state
        .pool
        .query_json(FIND_PUBLISHED, &[SqlParam::from(slug.as_str())])
        .await?;

    match rows.pop() {
        Some(project) => Ok(Reply::ok(project)),
        None => Err(AppError::not_found("Project not found")),
    }
}

/// Lowercase ASCII letters, digits and hyphens.
fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug.len() <= MAX_SLUG_LEN
        && slug
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_validation() {
        assert!(is_valid_slug("my-project-2"));
        assert!(!is_valid_slug(""));
        assert!(!is_valid_slug("Upper"));
        assert!(!is_valid_slug("with space"));
        assert!(!is_valid_slug("semi;colon"));
        assert!(!is_valid_slug(&"a".repeat(201)));
    }
}
