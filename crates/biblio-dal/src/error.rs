use crate::validation::FieldErrors;

pub type Result<T, E = Error> = std::result::Result<T, E>;

pub const UNIQUE_MESSAGE: &str = "already exists.";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Database error: {0}")]
    DatabaseError(sqlx::Error),

    #[error("Migration error: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("Validation failed: {0}")]
    ValidationFailed(FieldErrors),

    #[error("Unique constraint violated: {0}")]
    UniqueViolation(FieldErrors),

    #[error("Record not found: {0}")]
    RecordNotFound(String),
}

impl From<sqlx::Error> for Error {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::Database(ref db_error) if db_error.is_unique_violation() => {
                let (table, field) = violated_column(db_error.message());
                Error::UniqueViolation(FieldErrors::single(
                    field,
                    format!("{table} with this {field} {UNIQUE_MESSAGE}"),
                ))
            }
            e => Error::DatabaseError(e),
        }
    }
}

impl From<garde::Report> for Error {
    fn from(report: garde::Report) -> Self {
        Error::ValidationFailed(report.into())
    }
}

// SQLite reports "UNIQUE constraint failed: book.isbn"
fn violated_column(message: &str) -> (&str, &str) {
    let column = message
        .rsplit(": ")
        .next()
        .and_then(|cols| cols.split(',').next())
        .map(str::trim)
        .unwrap_or_default();
    match column.split_once('.') {
        Some((table, field)) => (table, field),
        None => ("record", column),
    }
}
