use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::Json;
use biblio_dal::book::{CreateBook, PartialBook};
use biblio_dal::validation::{
    DATE_MESSAGE, INTEGER_MESSAGE, NULL_MESSAGE, STRING_MESSAGE,
};
use biblio_dal::FieldErrors;
use garde::Validate;
use http::request::Parts;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::fmt::{Display, Formatter};
use std::ops::{Deref, DerefMut};
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Extractor wrapper that runs `garde` validation on values extracted from
/// request parts.
///
/// Both the inner extractor's rejection and validation failures are turned
/// into [`ApiError`], so they reach the client as `400 Bad Request`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Garde<E>(pub E);

impl<E> Deref for Garde<E> {
    type Target = E;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<E> DerefMut for Garde<E> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl<E: Display> Display for Garde<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl<E> Garde<E> {
    /// Consumes the `Garde` and returns the validated data within.
    pub fn into_inner(self) -> E {
        self.0
    }
}

impl<Extractor, T> FromRequestParts<AppState> for Garde<Extractor>
where
    T: Validate<Context = ()>,
    Extractor: Deref<Target = T> + FromRequestParts<AppState>,
    ApiError: From<<Extractor as FromRequestParts<AppState>>::Rejection>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let inner = Extractor::from_request_parts(parts, state).await?;

        inner.deref().validate()?;
        Ok(Garde(inner))
    }
}

/// Book fields read one by one from a JSON object body.
///
/// Only a body that is not a JSON object fails extraction. A field with
/// a wrong type or an explicit `null` is recorded under its own name and
/// reported together with the other field errors.
#[derive(Debug, Clone, Default)]
pub struct BookPayload {
    fields: PartialBook,
    invalid: FieldErrors,
}

impl BookPayload {
    pub fn from_object(mut object: Map<String, Value>) -> Self {
        let mut invalid = FieldErrors::new();
        let fields = PartialBook {
            isbn: take_field(&mut object, "isbn", STRING_MESSAGE, &mut invalid),
            title: take_field(&mut object, "title", STRING_MESSAGE, &mut invalid),
            author: take_field(&mut object, "author", STRING_MESSAGE, &mut invalid),
            published_date: take_field(&mut object, "published_date", DATE_MESSAGE, &mut invalid),
            stock: take_field(&mut object, "stock", INTEGER_MESSAGE, &mut invalid),
        };
        BookPayload { fields, invalid }
    }

    /// Supplied fields only, for partial updates.
    pub fn into_partial(self) -> ApiResult<PartialBook> {
        let mut errors = self.invalid;
        if let Err(report) = self.fields.validate() {
            errors.merge(report.into());
        }
        if errors.is_empty() {
            Ok(self.fields)
        } else {
            Err(ApiError::Validation(errors))
        }
    }

    /// All fields required, for create and full replacement.
    pub fn into_complete(self) -> ApiResult<CreateBook> {
        let mut errors = self.invalid;
        if let Err(report) = self.fields.validate() {
            errors.merge(report.into());
        }
        match CreateBook::try_from(self.fields) {
            Ok(book) if errors.is_empty() => Ok(book),
            Ok(_) => Err(ApiError::Validation(errors)),
            Err(missing) => {
                errors.merge_missing(missing);
                Err(ApiError::Validation(errors))
            }
        }
    }
}

fn take_field<T: DeserializeOwned>(
    object: &mut Map<String, Value>,
    name: &str,
    message: &str,
    invalid: &mut FieldErrors,
) -> Option<T> {
    match object.remove(name)? {
        Value::Null => {
            invalid.add(name, NULL_MESSAGE);
            None
        }
        value => match serde_json::from_value(value) {
            Ok(value) => Some(value),
            Err(e) => {
                debug!("Invalid value of {name}: {e}");
                invalid.add(name, message);
                None
            }
        },
    }
}

impl FromRequest<AppState> for BookPayload {
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let Json(object) = Json::<Map<String, Value>>::from_request(req, state).await?;
        Ok(BookPayload::from_object(object))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use biblio_dal::validation::{ISBN_MESSAGE, REQUIRED_MESSAGE};
    use serde_json::json;

    fn payload(value: Value) -> BookPayload {
        match value {
            Value::Object(object) => BookPayload::from_object(object),
            other => panic!("not an object: {other}"),
        }
    }

    fn field_errors(result: ApiResult<impl std::fmt::Debug>) -> FieldErrors {
        match result {
            Err(ApiError::Validation(errors)) => errors,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_complete_payload() {
        let book = payload(json!({"isbn": "1234567890", "title": "T", "author": "A",
            "published_date": "2020-02-29", "stock": 0, "unknown": true}))
        .into_complete()
        .unwrap();
        assert_eq!("1234567890", book.isbn);
        assert_eq!(0, book.stock);
    }

    #[test]
    fn test_malformed_values_keyed_by_field() {
        let errors = field_errors(
            payload(json!({"isbn": 1234567890, "title": "T", "author": "A",
                "published_date": "2020-13-45", "stock": "many"}))
            .into_complete(),
        );
        assert_eq!(Some(&[STRING_MESSAGE.to_string()][..]), errors.get("isbn"));
        assert_eq!(Some(&[DATE_MESSAGE.to_string()][..]), errors.get("published_date"));
        assert_eq!(Some(&[INTEGER_MESSAGE.to_string()][..]), errors.get("stock"));
        assert_eq!(vec!["isbn", "published_date", "stock"], errors.fields().collect::<Vec<_>>());
    }

    #[test]
    fn test_missing_and_invalid_together() {
        let errors = field_errors(
            payload(json!({"isbn": "123", "stock": 1.5})).into_complete(),
        );
        assert_eq!(Some(&[ISBN_MESSAGE.to_string()][..]), errors.get("isbn"));
        assert_eq!(Some(&[INTEGER_MESSAGE.to_string()][..]), errors.get("stock"));
        assert_eq!(Some(&[REQUIRED_MESSAGE.to_string()][..]), errors.get("title"));
        assert_eq!(Some(&[REQUIRED_MESSAGE.to_string()][..]), errors.get("published_date"));
    }

    #[test]
    fn test_null_rejected() {
        let errors = field_errors(payload(json!({"title": null, "stock": null})).into_partial());
        assert_eq!(Some(&[NULL_MESSAGE.to_string()][..]), errors.get("title"));
        assert_eq!(Some(&[NULL_MESSAGE.to_string()][..]), errors.get("stock"));

        let patch = payload(json!({"stock": 3})).into_partial().unwrap();
        assert_eq!(Some(3), patch.stock);
        assert_eq!(None, patch.title);
    }
}
