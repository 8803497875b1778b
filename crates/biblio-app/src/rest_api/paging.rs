use biblio_dal::{Batch, ListingParams};
use garde::Validate;
use http::Uri;
use serde::Serialize;
use url::Url;

use crate::state::AppConfig;

#[derive(Debug, Clone, Default, Validate, serde::Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
#[cfg_attr(feature = "openapi",into_params(parameter_in = Query))]
pub struct Paging {
    /// Page number, starting at 1
    #[garde(range(min = 1))]
    page: Option<u32>,
    /// Clamped to the configured maximum, 0 means default
    #[garde(skip)]
    page_size: Option<u32>,
}

impl Paging {
    pub fn new(page: Option<u32>, page_size: Option<u32>) -> Self {
        Paging { page, page_size }
    }

    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1)
    }

    pub fn page_size(&self, config: &AppConfig) -> u32 {
        match self.page_size {
            None | Some(0) => config.default_page_size,
            Some(size) => size.min(config.max_page_size),
        }
    }

    pub fn listing_params(&self, page_size: u32) -> ListingParams {
        let offset = u64::from(self.page().saturating_sub(1)) * u64::from(page_size);
        ListingParams::new(offset as i64, page_size.into())
    }
}

/// Builds absolute links to other pages of the current listing,
/// keeping all query parameters except `page`.
#[derive(Debug, Clone)]
pub struct PageLinks {
    url: Url,
}

impl PageLinks {
    pub fn new(base_url: &Url, uri: &Uri) -> Result<Self, url::ParseError> {
        let path = match uri.path().trim_end_matches('/') {
            "" => "/",
            path => path,
        };
        let mut url = base_url.join(path)?;
        url.set_query(uri.query());
        Ok(PageLinks { url })
    }

    pub fn page_url(&self, page: u32) -> String {
        let kept: Vec<(String, String)> = self
            .url
            .query_pairs()
            .filter(|(name, _)| name != "page")
            .map(|(name, value)| (name.into_owned(), value.into_owned()))
            .collect();

        let mut url = self.url.clone();
        if kept.is_empty() && page <= 1 {
            url.set_query(None);
        } else {
            let mut query = url.query_pairs_mut();
            query.clear().extend_pairs(kept);
            // first page is addressed without the parameter
            if page > 1 {
                query.append_pair("page", &page.to_string());
            }
        }
        url.to_string()
    }
}

#[derive(Debug, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Page<T> {
    count: u64,
    next: Option<String>,
    previous: Option<String>,
    results: Vec<T>,
}

impl<T> Page<T>
where
    T: Serialize,
{
    pub fn from_batch(batch: Batch<T>, page: u32, page_size: u32, links: &PageLinks) -> Self {
        let last_page = last_page(batch.total, page_size);
        let next = (u64::from(page) < last_page).then(|| links.page_url(page.saturating_add(1)));
        let previous = (page > 1).then(|| {
            let previous = u64::from(page - 1).min(last_page);
            links.page_url(previous as u32)
        });

        Self {
            count: batch.total,
            next,
            previous,
            results: batch.rows,
        }
    }
}

fn last_page(total: u64, page_size: u32) -> u64 {
    let page_size = u64::from(page_size.max(1));
    total.div_ceil(page_size).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AppConfig {
        AppConfig {
            base_url: Url::parse("http://localhost:3000").unwrap(),
            default_page_size: 10,
            max_page_size: 100,
        }
    }

    fn links(path_and_query: &str) -> PageLinks {
        let uri: Uri = path_and_query.parse().unwrap();
        PageLinks::new(&config().base_url, &uri).unwrap()
    }

    fn batch(total: u64, rows: usize) -> Batch<u32> {
        Batch {
            offset: 0,
            limit: 10,
            total,
            rows: vec![0; rows],
        }
    }

    #[test]
    fn test_page_size() {
        let config = config();
        assert_eq!(10, Paging::default().page_size(&config));
        assert_eq!(10, Paging::new(None, Some(0)).page_size(&config));
        assert_eq!(25, Paging::new(None, Some(25)).page_size(&config));
        assert_eq!(100, Paging::new(None, Some(1000)).page_size(&config));
    }

    #[test]
    fn test_listing_params() {
        let params = Paging::new(Some(3), None).listing_params(10);
        assert_eq!(20, params.offset);
        assert_eq!(10, params.limit);
        let params = Paging::default().listing_params(10);
        assert_eq!(0, params.offset);
    }

    #[test]
    fn test_page_validation() {
        assert!(Paging::new(Some(0), None).validate().is_err());
        assert!(Paging::new(Some(1), Some(0)).validate().is_ok());
    }

    #[test]
    fn test_page_links() {
        let filtered = links("/api/books?author=William+Vincent&page=2");
        assert_eq!(
            "http://localhost:3000/api/books?author=William+Vincent&page=3",
            filtered.page_url(3)
        );
        assert_eq!(
            "http://localhost:3000/api/books?author=William+Vincent",
            filtered.page_url(1)
        );

        let slashed = links("/api/books/");
        assert_eq!("http://localhost:3000/api/books?page=2", slashed.page_url(2));
        assert_eq!("http://localhost:3000/api/books", slashed.page_url(1));
    }

    #[test]
    fn test_page_navigation() {
        let listing = links("/api/books");

        let page = Page::from_batch(batch(18, 10), 1, 10, &listing);
        assert_eq!(18, page.count);
        assert_eq!(
            Some("http://localhost:3000/api/books?page=2".to_string()),
            page.next
        );
        assert_eq!(None, page.previous);

        let page = Page::from_batch(batch(18, 8), 2, 10, &listing);
        assert_eq!(None, page.next);
        assert_eq!(Some("http://localhost:3000/api/books".to_string()), page.previous);

        let page = Page::from_batch(batch(18, 0), 7, 10, &listing);
        assert!(page.results.is_empty());
        assert_eq!(None, page.next);
        assert_eq!(
            Some("http://localhost:3000/api/books?page=2".to_string()),
            page.previous
        );

        let page = Page::from_batch(batch(0, 0), 1, 10, &listing);
        assert_eq!(None, page.next);
        assert_eq!(None, page.previous);
    }

    #[test]
    fn test_page_serialization() {
        let page = Page::from_batch(batch(3, 3), 1, 10, &links("/api/books"));
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["count"], 3);
        assert!(json["next"].is_null());
        assert!(json["previous"].is_null());
        assert_eq!(json["results"].as_array().unwrap().len(), 3);
    }
}
