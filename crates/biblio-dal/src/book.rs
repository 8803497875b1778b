use std::fmt::Display;

use futures::{StreamExt as _, TryStreamExt as _};
use garde::Validate;
use serde::{Deserialize, Serialize};
use sqlx::{Pool, QueryBuilder};
use tracing::debug;

use crate::{
    Batch, ChosenDB, ListingParams, MAX_LIMIT,
    error::{Error, Result},
    validation::{FieldErrors, REQUIRED_MESSAGE, valid_isbn, valid_stock},
};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, sqlx::FromRow)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Book {
    pub id: i64,
    pub isbn: String,
    pub title: String,
    pub author: String,
    pub published_date: time::Date,
    pub stock: i64,
}

impl Display for Book {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.title)
    }
}

/// Complete set of book fields, used for creation and full replacement.
#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CreateBook {
    #[garde(custom(valid_isbn))]
    pub isbn: String,
    #[garde(length(chars, min = 1, max = 200))]
    pub title: String,
    #[garde(length(chars, min = 1, max = 100))]
    pub author: String,
    #[garde(skip)]
    pub published_date: time::Date,
    #[garde(custom(valid_stock))]
    pub stock: i64,
}

/// Any subset of book fields. Absent fields are left untouched by
/// [`BookRepositoryImpl::update_partial`].
#[derive(Debug, Serialize, Deserialize, Clone, Default, Validate)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct PartialBook {
    #[garde(inner(custom(valid_isbn)))]
    pub isbn: Option<String>,
    #[garde(length(chars, min = 1, max = 200))]
    pub title: Option<String>,
    #[garde(length(chars, min = 1, max = 100))]
    pub author: Option<String>,
    #[garde(skip)]
    pub published_date: Option<time::Date>,
    #[garde(inner(custom(valid_stock)))]
    pub stock: Option<i64>,
}

impl TryFrom<PartialBook> for CreateBook {
    type Error = FieldErrors;

    fn try_from(value: PartialBook) -> std::result::Result<Self, Self::Error> {
        let mut missing = FieldErrors::new();
        let mut require = |name: &str, present: bool| {
            if !present {
                missing.add(name, REQUIRED_MESSAGE);
            }
        };
        require("isbn", value.isbn.is_some());
        require("title", value.title.is_some());
        require("author", value.author.is_some());
        require("published_date", value.published_date.is_some());
        require("stock", value.stock.is_some());

        match (
            value.isbn,
            value.title,
            value.author,
            value.published_date,
            value.stock,
        ) {
            (Some(isbn), Some(title), Some(author), Some(published_date), Some(stock)) => {
                Ok(CreateBook {
                    isbn,
                    title,
                    author,
                    published_date,
                    stock,
                })
            }
            _ => Err(missing),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
#[cfg_attr(feature = "openapi", into_params(parameter_in = Query))]
pub struct BookFilter {
    /// Case-insensitive substring of the author
    #[garde(length(max = 255))]
    pub author: Option<String>,
    /// Terms separated by spaces or commas, each must occur in title or author
    #[garde(length(max = 255))]
    pub search: Option<String>,
}

impl BookFilter {
    pub fn by_author(author: impl Into<String>) -> Self {
        BookFilter {
            author: Some(author.into()),
            search: None,
        }
    }

    pub fn by_search(search: impl Into<String>) -> Self {
        BookFilter {
            author: None,
            search: Some(search.into()),
        }
    }

    pub fn search_terms(&self) -> Vec<&str> {
        self.search
            .as_deref()
            .map(|s| {
                s.split(|c: char| c.is_whitespace() || c == ',')
                    .filter(|t| !t.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn push_conditions(&self, query: &mut QueryBuilder<'_, ChosenDB>) {
        let mut keyword = " WHERE ";
        if let Some(author) = &self.author {
            query
                .push(keyword)
                .push("instr(lower(author), lower(")
                .push_bind(author.clone())
                .push(")) > 0");
            keyword = " AND ";
        }
        for term in self.search_terms() {
            query
                .push(keyword)
                .push("(instr(lower(title), lower(")
                .push_bind(term.to_string())
                .push(")) > 0 OR instr(lower(author), lower(")
                .push_bind(term.to_string())
                .push(")) > 0)");
            keyword = " AND ";
        }
    }
}

const SELECT_BOOKS: &str = "SELECT id, isbn, title, author, published_date, stock FROM book";

fn not_found(key: impl Display) -> Error {
    Error::RecordNotFound(format!("Book {key}"))
}

pub type BookRepository = BookRepositoryImpl<Pool<ChosenDB>>;

pub struct BookRepositoryImpl<E> {
    executor: E,
}

impl<'c, E> BookRepositoryImpl<E>
where
    for<'a> &'a E: sqlx::Executor<'c, Database = ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    pub async fn create(&self, payload: CreateBook) -> Result<Book> {
        payload.validate()?;
        let record = sqlx::query_as::<_, Book>(
            "INSERT INTO book (isbn, title, author, published_date, stock) VALUES (?, ?, ?, ?, ?) \
            RETURNING id, isbn, title, author, published_date, stock",
        )
        .bind(&payload.isbn)
        .bind(&payload.title)
        .bind(&payload.author)
        .bind(payload.published_date)
        .bind(payload.stock)
        .fetch_one(&self.executor)
        .await?;

        debug!(id = record.id, isbn = %record.isbn, "Created book");
        Ok(record)
    }

    pub async fn update(&self, id: i64, payload: CreateBook) -> Result<Book> {
        payload.validate()?;
        let record = sqlx::query_as::<_, Book>(
            "UPDATE book SET isbn = ?, title = ?, author = ?, published_date = ?, stock = ? \
            WHERE id = ? RETURNING id, isbn, title, author, published_date, stock",
        )
        .bind(&payload.isbn)
        .bind(&payload.title)
        .bind(&payload.author)
        .bind(payload.published_date)
        .bind(payload.stock)
        .bind(id)
        .fetch_optional(&self.executor)
        .await?
        .ok_or_else(|| not_found(id))?;

        debug!(id, "Replaced book");
        Ok(record)
    }

    pub async fn update_partial(&self, id: i64, payload: PartialBook) -> Result<Book> {
        payload.validate()?;
        let record = sqlx::query_as::<_, Book>(
            "UPDATE book SET isbn = COALESCE(?, isbn), title = COALESCE(?, title), \
            author = COALESCE(?, author), published_date = COALESCE(?, published_date), \
            stock = COALESCE(?, stock) WHERE id = ? \
            RETURNING id, isbn, title, author, published_date, stock",
        )
        .bind(payload.isbn.as_deref())
        .bind(payload.title.as_deref())
        .bind(payload.author.as_deref())
        .bind(payload.published_date)
        .bind(payload.stock)
        .bind(id)
        .fetch_optional(&self.executor)
        .await?
        .ok_or_else(|| not_found(id))?;

        debug!(id, "Updated book");
        Ok(record)
    }

    pub async fn count(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT count(*) FROM book")
            .fetch_one(&self.executor)
            .await?;
        Ok(count.max(0) as u64)
    }

    pub async fn list_all(&self) -> Result<Batch<Book>> {
        self.list(&BookFilter::default(), ListingParams::default())
            .await
    }

    pub async fn list(&self, filter: &BookFilter, params: ListingParams) -> Result<Batch<Book>> {
        let mut count_query: QueryBuilder<ChosenDB> = QueryBuilder::new("SELECT count(*) FROM book");
        filter.push_conditions(&mut count_query);
        let total: i64 = count_query
            .build_query_scalar()
            .fetch_one(&self.executor)
            .await?;

        let mut query: QueryBuilder<ChosenDB> = QueryBuilder::new(SELECT_BOOKS);
        filter.push_conditions(&mut query);
        query
            .push(" ORDER BY id LIMIT ")
            .push_bind(params.limit)
            .push(" OFFSET ")
            .push_bind(params.offset);
        let rows = query
            .build_query_as::<Book>()
            .fetch(&self.executor)
            .take(MAX_LIMIT)
            .try_collect::<Vec<_>>()
            .await?;

        Ok(Batch {
            offset: params.offset,
            limit: params.limit,
            total: total.max(0) as u64,
            rows,
        })
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        let res = sqlx::query("DELETE FROM book WHERE id = ?")
            .bind(id)
            .execute(&self.executor)
            .await?;

        if res.rows_affected() == 0 {
            Err(not_found(id))
        } else {
            debug!(id, "Deleted book");
            Ok(())
        }
    }

    pub async fn delete_by_isbn(&self, isbn: &str) -> Result<()> {
        let res = sqlx::query("DELETE FROM book WHERE isbn = ?")
            .bind(isbn)
            .execute(&self.executor)
            .await?;

        if res.rows_affected() == 0 {
            Err(not_found(format!("with ISBN {isbn}")))
        } else {
            debug!(isbn, "Deleted book");
            Ok(())
        }
    }

    pub async fn get(&self, id: i64) -> Result<Book> {
        sqlx::query_as::<_, Book>(
            "SELECT id, isbn, title, author, published_date, stock FROM book WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.executor)
        .await?
        .ok_or_else(|| not_found(id))
    }

    pub async fn get_by_isbn(&self, isbn: &str) -> Result<Book> {
        sqlx::query_as::<_, Book>(
            "SELECT id, isbn, title, author, published_date, stock FROM book WHERE isbn = ?",
        )
        .bind(isbn)
        .fetch_optional(&self.executor)
        .await?
        .ok_or_else(|| not_found(format!("with ISBN {isbn}")))
    }
}
