use anyhow::{Result, anyhow};
use biblio_dal::book::Book;
use futures::TryStreamExt as _;
use reqwest::Url;
use serde_json::json;
use sqlx::Executor as _;
use tracing::info;

pub const SEED_BOOKS: &str = r#"
INSERT INTO book (isbn, title, author, published_date, stock)
VALUES ('1234567890123', 'Django for Beginners', 'William Vincent', '2020-01-01', 5);

INSERT INTO book (isbn, title, author, published_date, stock)
VALUES ('9876543210987', 'Python Crash Course', 'Eric Matthes', '2019-05-15', 3);

INSERT INTO book (isbn, title, author, published_date, stock)
VALUES ('1111111111111', 'Two Scoops of Django', 'William Vincent', '2021-03-10', 8);
"#;

/// Inserts the three well known books directly into the database.
pub async fn seed_books(database_url: &str) -> Result<()> {
    let pool = biblio_dal::new_pool(database_url).await?;
    pool.execute_many(SEED_BOOKS).try_collect::<Vec<_>>().await?;
    pool.close().await;
    Ok(())
}

pub fn book_payload(isbn: &str, title: &str, author: &str, stock: i64) -> serde_json::Value {
    json!({
        "isbn": isbn,
        "title": title,
        "author": author,
        "published_date": "2023-01-01",
        "stock": stock
    })
}

pub async fn create_book(
    client: &reqwest::Client,
    base_url: &Url,
    payload: &serde_json::Value,
) -> Result<Book> {
    let api_url = base_url.join("api/books/")?;

    let response = client.post(api_url).json(payload).send().await?;
    info!("Create response: {:#?}", response);
    if response.status().as_u16() != 201 {
        let status = response.status();
        let body = response.text().await?;
        return Err(anyhow!("Book not created, status {status}: {body}"));
    }

    let new_book: Book = response.json().await?;
    Ok(new_book)
}

pub async fn book_count(client: &reqwest::Client, base_url: &Url) -> Result<u64> {
    let api_url = base_url.join("api/books/")?;
    let page: serde_json::Value = client.get(api_url).send().await?.json().await?;
    page["count"]
        .as_u64()
        .ok_or_else(|| anyhow!("Missing count in {page}"))
}
