use biblio_dal::book::BookRepository;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::routing::{delete, get};

crate::repository_from_request!(BookRepository);

pub mod crud_api {
    use super::*;
    use crate::rest_api::{Page, PageLinks, Paging};
    use crate::validate::{BookPayload, Garde};
    use axum::{
        extract::{rejection::PathRejection, OriginalUri, Path, Query, State},
        response::IntoResponse,
        Json,
    };
    #[cfg(feature = "openapi")]
    use biblio_dal::book::{Book, CreateBook, PartialBook};
    use biblio_dal::book::BookFilter;
    use http::StatusCode;
    use tracing::debug;

    /// Ids that do not parse as integers cannot match any book.
    fn book_id(id: Result<Path<i64>, PathRejection>) -> ApiResult<i64> {
        match id {
            Ok(Path(id)) => Ok(id),
            Err(rejection) => {
                debug!("Invalid book id: {}", rejection.body_text());
                Err(ApiError::NotFound("Book".to_string()))
            }
        }
    }

    #[cfg_attr(feature = "openapi",  utoipa::path(get, path = "", tag = "Book", operation_id = "listBook",
    params(Paging, BookFilter), responses((status = StatusCode::OK, description = "List paginated", body = crate::rest_api::Page<Book>))))]
    pub async fn list(
        repository: BookRepository,
        State(state): State<AppState>,
        OriginalUri(uri): OriginalUri,
        Garde(Query(paging)): Garde<Query<Paging>>,
        Garde(Query(filter)): Garde<Query<BookFilter>>,
    ) -> ApiResult<impl IntoResponse> {
        let page = paging.page();
        let page_size = paging.page_size(state.config());
        let batch = repository
            .list(&filter, paging.listing_params(page_size))
            .await?;
        debug!(page, page_size, total = batch.total, "Listed books");
        let links = PageLinks::new(&state.config().base_url, &uri)?;
        Ok((
            StatusCode::OK,
            Json(Page::from_batch(batch, page, page_size, &links)),
        ))
    }

    #[cfg_attr(feature = "openapi",  utoipa::path(post, path = "", tag = "Book", operation_id = "createBook",
    request_body = CreateBook,
    responses((status = StatusCode::CREATED, description = "Created Book", body = Book),
        (status = StatusCode::BAD_REQUEST, description = "Invalid fields", body = biblio_dal::FieldErrors))))]
    pub async fn create(
        repository: BookRepository,
        payload: BookPayload,
    ) -> ApiResult<impl IntoResponse> {
        let record = repository.create(payload.into_complete()?).await?;

        Ok((StatusCode::CREATED, Json(record)))
    }

    #[cfg_attr(feature = "openapi",  utoipa::path(get, path = "/{id}", tag = "Book", operation_id = "getBook",
    responses((status = StatusCode::OK, description = "Get one", body = Book),
        (status = StatusCode::NOT_FOUND, description = "No such book"))))]
    pub async fn get(
        id: Result<Path<i64>, PathRejection>,
        repository: BookRepository,
    ) -> ApiResult<impl IntoResponse> {
        let record = repository.get(book_id(id)?).await?;

        Ok((StatusCode::OK, Json(record)))
    }

    #[cfg_attr(feature = "openapi",  utoipa::path(put, path = "/{id}", tag = "Book", operation_id = "updateBook",
    request_body = CreateBook,
    responses((status = StatusCode::OK, description = "Replaced Book", body = Book),
        (status = StatusCode::BAD_REQUEST, description = "Invalid fields", body = biblio_dal::FieldErrors),
        (status = StatusCode::NOT_FOUND, description = "No such book"))))]
    pub async fn update(
        id: Result<Path<i64>, PathRejection>,
        repository: BookRepository,
        payload: BookPayload,
    ) -> ApiResult<impl IntoResponse> {
        let id = book_id(id)?;
        let record = repository.update(id, payload.into_complete()?).await?;

        Ok((StatusCode::OK, Json(record)))
    }

    #[cfg_attr(feature = "openapi",  utoipa::path(patch, path = "/{id}", tag = "Book", operation_id = "partialUpdateBook",
    request_body = PartialBook,
    responses((status = StatusCode::OK, description = "Updated Book", body = Book),
        (status = StatusCode::BAD_REQUEST, description = "Invalid fields", body = biblio_dal::FieldErrors),
        (status = StatusCode::NOT_FOUND, description = "No such book"))))]
    pub async fn partial_update(
        id: Result<Path<i64>, PathRejection>,
        repository: BookRepository,
        payload: BookPayload,
    ) -> ApiResult<impl IntoResponse> {
        let id = book_id(id)?;
        let record = repository.update_partial(id, payload.into_partial()?).await?;

        Ok((StatusCode::OK, Json(record)))
    }

    #[cfg_attr(feature = "openapi",  utoipa::path(delete, path = "/{id}", tag = "Book", operation_id = "deleteBook",
    responses((status = StatusCode::NO_CONTENT, description = "Deleted"),
        (status = StatusCode::NOT_FOUND, description = "No such book"))))]
    pub async fn delete(
        id: Result<Path<i64>, PathRejection>,
        repository: BookRepository,
    ) -> ApiResult<impl IntoResponse> {
        repository.delete(book_id(id)?).await?;

        Ok((StatusCode::NO_CONTENT, ()))
    }

    #[cfg_attr(feature = "openapi",  utoipa::path(delete, path = "/delete-by-isbn/{isbn}", tag = "Book", operation_id = "deleteBookByIsbn",
    responses((status = StatusCode::NO_CONTENT, description = "Deleted"),
        (status = StatusCode::NOT_FOUND, description = "No book with this ISBN"))))]
    pub async fn delete_by_isbn(
        Path(isbn): Path<String>,
        repository: BookRepository,
    ) -> ApiResult<impl IntoResponse> {
        repository.delete_by_isbn(&isbn).await?;

        Ok((StatusCode::NO_CONTENT, ()))
    }

    #[cfg(feature = "openapi")]
    #[derive(utoipa::OpenApi)]
    #[openapi(paths(list, create, get, update, partial_update, delete, delete_by_isbn))]
    struct ApiDocs;

    #[cfg(feature = "openapi")]
    pub(super) fn api_docs() -> utoipa::openapi::OpenApi {
        use utoipa::OpenApi as _;
        ApiDocs::openapi()
    }
}

#[cfg(feature = "openapi")]
pub fn api_docs() -> utoipa::openapi::OpenApi {
    crud_api::api_docs()
}

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/", get(crud_api::list).post(crud_api::create))
        .route(
            "/delete-by-isbn/{isbn}",
            delete(crud_api::delete_by_isbn),
        )
        .route(
            "/{id}",
            get(crud_api::get)
                .put(crud_api::update)
                .patch(crud_api::partial_update)
                .delete(crud_api::delete),
        )
}
