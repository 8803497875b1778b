//! Field rules shared by the storage layer and the HTTP boundary.
//!
//! The isbn and stock predicates are checked twice, once when a request
//! payload is extracted and again right before the repository writes.
//! Both call sites go through the functions below, so the two checks
//! cannot drift apart.

use std::{collections::BTreeMap, fmt::Display};

use serde::Serialize;

pub const ISBN_LENGTHS: [usize; 2] = [10, 13];

pub const ISBN_MESSAGE: &str = "ISBN must be 10 or 13 characters long";
pub const STOCK_MESSAGE: &str = "Stock cannot be negative";
pub const REQUIRED_MESSAGE: &str = "This field is required.";
pub const NULL_MESSAGE: &str = "This field may not be null.";
pub const STRING_MESSAGE: &str = "Not a valid string.";
pub const INTEGER_MESSAGE: &str = "A valid integer is required.";
pub const DATE_MESSAGE: &str =
    "Date has wrong format. Use one of these formats instead: YYYY-MM-DD.";
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

/// Length only, no checksum.
pub fn check_isbn(isbn: &str) -> Result<(), &'static str> {
    if ISBN_LENGTHS.contains(&isbn.chars().count()) {
        Ok(())
    } else {
        Err(ISBN_MESSAGE)
    }
}

pub fn check_stock(stock: i64) -> Result<(), &'static str> {
    if stock < 0 {
        Err(STOCK_MESSAGE)
    } else {
        Ok(())
    }
}

pub(crate) fn valid_isbn(value: &str, _ctx: &()) -> garde::Result {
    check_isbn(value).map_err(garde::Error::new)
}

pub(crate) fn valid_stock(value: &i64, _ctx: &()) -> garde::Result {
    check_stock(*value).map_err(garde::Error::new)
}

/// Reasons for rejecting a write, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn merge(&mut self, other: FieldErrors) {
        for (field, messages) in other.0 {
            self.0.entry(field).or_default().extend(messages);
        }
    }

    /// Like `merge`, but skips fields that already have errors.
    pub fn merge_missing(&mut self, other: FieldErrors) {
        for (field, messages) in other.0 {
            self.0.entry(field).or_insert(messages);
        }
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<garde::Report> for FieldErrors {
    fn from(report: garde::Report) -> Self {
        let mut errors = FieldErrors::new();
        for (path, error) in report.iter() {
            let path = path.to_string();
            // nested paths like "isbn[0]" are reported on the top level field
            let field = path
                .split(['.', '['])
                .next()
                .filter(|f| !f.is_empty())
                .unwrap_or(NON_FIELD_ERRORS);
            errors.add(field, error.message());
        }
        errors
    }
}

impl Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            if !first {
                write!(f, "; ")?;
            }
            first = false;
            write!(f, "{field}: {}", messages.join(", "))?;
        }
        Ok(())
    }
}
