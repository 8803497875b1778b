use axum::{extract::State, response::IntoResponse, Json};
use http::StatusCode;
use serde_json::json;

use crate::{error::ApiResult, state::AppState};

pub mod book;
mod paging;

pub use paging::*;

/// Directory of the book endpoints, with absolute links built from the configured base URL.
pub async fn api_root(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let books = state.build_url("api/books")?;
    // path templates are kept verbatim, Url would percent-encode the braces
    let by_id = format!("{books}/{{id}}");
    let by_isbn = format!("{books}/delete-by-isbn/{{isbn}}");
    let with_query = |query: &str| {
        let mut url = books.clone();
        url.set_query(Some(query));
        url.to_string()
    };

    let directory = json!({
        "books": books.as_str(),
        "endpoints": {
            "list": {"method": "GET", "url": books.as_str()},
            "create": {"method": "POST", "url": books.as_str()},
            "retrieve": {"method": "GET", "url": by_id},
            "update": {"method": "PUT", "url": by_id},
            "partial_update": {"method": "PATCH", "url": by_id},
            "delete": {"method": "DELETE", "url": by_id},
            "delete_by_isbn": {"method": "DELETE", "url": by_isbn},
        },
        "filters": {
            "author": with_query("author=William%20Vincent"),
            "search": with_query("search=django"),
            "page": with_query("page=2"),
        }
    });
    Ok((StatusCode::OK, Json(directory)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppConfig;

    #[tokio::test]
    async fn test_api_root_links() {
        let pool = biblio_dal::new_pool("sqlite::memory:").await.unwrap();
        let config = AppConfig {
            base_url: url::Url::parse("http://books.example.com/").unwrap(),
            default_page_size: 10,
            max_page_size: 100,
        };
        let response = api_root(State(AppState::new(config, pool)))
            .await
            .unwrap()
            .into_response();
        assert_eq!(StatusCode::OK, response.status());
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            "http://books.example.com/api/books",
            body["endpoints"]["list"]["url"]
        );
        assert_eq!(
            "http://books.example.com/api/books/delete-by-isbn/{isbn}",
            body["endpoints"]["delete_by_isbn"]["url"]
        );
        assert_eq!(
            "http://books.example.com/api/books?search=django",
            body["filters"]["search"]
        );
    }
}
