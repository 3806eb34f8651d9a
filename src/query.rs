//! Listing reads: the search query builder and the fixed feeds built on it.
//!
//! Every listing query is ordered newest first. Structured constraints and
//! the free-text term are ANDed; the term itself matches title, description
//! or location.

use crate::backend::types::{Filter, Order, ReadRequest, LISTINGS_TABLE};
use crate::backend::Backend;
use crate::error::AppError;
use crate::models::{Category, Listing};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info};

pub const TEXT_COLUMNS: [&str; 3] = ["title", "description", "location"];
pub const DEFAULT_RECENT_LIMIT: usize = 10;

/// User-supplied search constraints. `None` means "not constrained".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchFilters {
    /// Free text matched against title, description and location
    pub term: Option<String>,
    /// Inclusive lower price bound
    pub min_price: Option<f64>,
    /// Inclusive upper price bound
    pub max_price: Option<f64>,
    /// Exact bedroom count, even though the picker labels options "N+"
    pub bedrooms: Option<i32>,
    /// Exact bathroom count, same caveat as `bedrooms`
    pub bathrooms: Option<i32>,
    /// Category name or an `any`/`all` selector
    pub category: Option<String>,
}

/// Builder for a read against the listings table
#[derive(Debug, Clone)]
pub struct ListingQuery {
    request: ReadRequest,
}

impl Default for ListingQuery {
    fn default() -> Self {
        Self::new()
    }
}

impl ListingQuery {
    pub fn new() -> Self {
        Self {
            request: ReadRequest::from_table(LISTINGS_TABLE)
                .order_by(Order::descending("created_at")),
        }
    }

    pub fn from_filters(filters: &SearchFilters) -> Self {
        let mut query = Self::new();
        if let Some(term) = &filters.term {
            query = query.matching(term);
        }
        if let Some(min) = filters.min_price {
            query = query.min_price(min);
        }
        if let Some(max) = filters.max_price {
            query = query.max_price(max);
        }
        if let Some(bedrooms) = filters.bedrooms {
            query = query.bedrooms(bedrooms);
        }
        if let Some(bathrooms) = filters.bathrooms {
            query = query.bathrooms(bathrooms);
        }
        if let Some(selector) = &filters.category {
            query = query.category(selector);
        }
        query
    }

    /// An empty term adds no constraint
    pub fn matching(self, term: &str) -> Self {
        if term.is_empty() {
            return self;
        }
        self.with(Filter::contains_any(&TEXT_COLUMNS, term))
    }

    pub fn min_price(self, price: f64) -> Self {
        self.with(Filter::gte("price", price))
    }

    pub fn max_price(self, price: f64) -> Self {
        self.with(Filter::lte("price", price))
    }

    pub fn bedrooms(self, count: i32) -> Self {
        self.with(Filter::eq("bedrooms", count))
    }

    pub fn bathrooms(self, count: i32) -> Self {
        self.with(Filter::eq("bathrooms", count))
    }

    /// Sentinel selectors (`any`, `all`, empty) add no constraint; anything
    /// else is matched exactly as given
    pub fn category(self, selector: &str) -> Self {
        if Category::from_selector(selector).is_none() {
            return self;
        }
        self.with(Filter::eq("property_type", selector))
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.request = self.request.limit(limit);
        self
    }

    pub fn build(self) -> ReadRequest {
        self.request
    }

    fn with(mut self, filter: Filter) -> Self {
        self.request = self.request.filter(filter);
        self
    }
}

/// Run a listing read and decode the rows
pub async fn fetch_listings(
    backend: &dyn Backend,
    request: &ReadRequest,
) -> Result<Vec<Listing>, AppError> {
    let rows = backend.select(request).await.map_err(|e| {
        error!("Error loading listings from {}: {}", backend.backend_name(), e);
        AppError::query(e)
    })?;
    decode_rows(rows)
}

pub async fn search_listings(
    backend: &dyn Backend,
    filters: &SearchFilters,
) -> Result<Vec<Listing>, AppError> {
    debug!("Searching listings with {:?}", filters);
    let request = ListingQuery::from_filters(filters).build();
    let listings = fetch_listings(backend, &request).await?;
    info!("Search matched {} listings", listings.len());
    Ok(listings)
}

/// Newest listings for the home feed
pub async fn recent_listings(backend: &dyn Backend, limit: usize) -> Result<Vec<Listing>, AppError> {
    fetch_listings(backend, &ListingQuery::new().limit(limit).build()).await
}

/// Free-text search from the home search bar
pub async fn search_by_term(backend: &dyn Backend, term: &str) -> Result<Vec<Listing>, AppError> {
    fetch_listings(backend, &ListingQuery::new().matching(term).build()).await
}

/// Listings of one category, or all of them for a sentinel selector
pub async fn listings_by_category(
    backend: &dyn Backend,
    selector: &str,
) -> Result<Vec<Listing>, AppError> {
    fetch_listings(backend, &ListingQuery::new().category(selector).build()).await
}

pub async fn get_listing(backend: &dyn Backend, id: &str) -> Result<Option<Listing>, AppError> {
    let request = ReadRequest::from_table(LISTINGS_TABLE)
        .filter(Filter::eq("id", id))
        .limit(1);
    Ok(fetch_listings(backend, &request).await?.into_iter().next())
}

pub(crate) fn decode_rows<T: DeserializeOwned>(rows: Vec<Value>) -> Result<Vec<T>, AppError> {
    rows.into_iter()
        .map(|row| {
            serde_json::from_value(row).map_err(|e| {
                error!("Undecodable row: {}", e);
                AppError::QueryFailure(e.to_string())
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::demo::listing_row;

    async fn backend_with(rows: Vec<Value>) -> MemoryBackend {
        let backend = MemoryBackend::new();
        backend.seed(LISTINGS_TABLE, rows).await;
        backend
    }

    fn ids(listings: &[Listing]) -> Vec<&str> {
        listings.iter().map(|l| l.id.as_str()).collect()
    }

    fn two_listings() -> Vec<Value> {
        vec![
            listing_row("A", "Starter home", 100_000.0, 2, 1, "House", "2024-01-01T00:00:00Z"),
            listing_row("B", "Family villa", 300_000.0, 4, 3, "Villa", "2024-02-01T00:00:00Z"),
        ]
    }

    #[test]
    fn builds_conjunction_in_fixed_order() {
        let filters = SearchFilters {
            term: Some("lake".into()),
            min_price: Some(1.0),
            max_price: Some(2.0),
            bedrooms: Some(3),
            bathrooms: Some(2),
            category: Some("Cabin".into()),
        };

        let request = ListingQuery::from_filters(&filters).build();
        assert_eq!(request.table, "properties");
        assert_eq!(request.order, Some(Order::descending("created_at")));
        assert_eq!(
            request.filters,
            vec![
                Filter::contains_any(&TEXT_COLUMNS, "lake"),
                Filter::gte("price", 1.0),
                Filter::lte("price", 2.0),
                Filter::eq("bedrooms", 3),
                Filter::eq("bathrooms", 2),
                Filter::eq("property_type", "Cabin"),
            ]
        );
    }

    #[test]
    fn empty_term_and_any_category_add_nothing() {
        let filters = SearchFilters {
            term: Some(String::new()),
            category: Some("Any".into()),
            ..SearchFilters::default()
        };
        assert!(ListingQuery::from_filters(&filters).build().filters.is_empty());
    }

    #[tokio::test]
    async fn min_price_and_bedrooms_scenario() {
        let backend = backend_with(two_listings()).await;

        let by_price = SearchFilters {
            min_price: Some(150_000.0),
            ..SearchFilters::default()
        };
        assert_eq!(ids(&search_listings(&backend, &by_price).await.unwrap()), vec!["B"]);

        let by_bedrooms = SearchFilters {
            bedrooms: Some(2),
            ..SearchFilters::default()
        };
        assert_eq!(ids(&search_listings(&backend, &by_bedrooms).await.unwrap()), vec!["A"]);
    }

    #[tokio::test]
    async fn bedrooms_filter_is_exact_not_at_least() {
        let backend = backend_with(vec![
            listing_row("two", "t", 1.0, 2, 1, "Loft", "2024-01-01T00:00:00Z"),
            listing_row("three", "t", 1.0, 3, 1, "Loft", "2024-01-02T00:00:00Z"),
            listing_row("four", "t", 1.0, 4, 1, "Loft", "2024-01-03T00:00:00Z"),
        ])
        .await;

        let filters = SearchFilters {
            bedrooms: Some(3),
            ..SearchFilters::default()
        };
        let found = search_listings(&backend, &filters).await.unwrap();
        assert!(found.iter().all(|l| l.bedrooms == 3));
        assert_eq!(ids(&found), vec!["three"]);
    }

    #[tokio::test]
    async fn price_range_is_inclusive_on_both_ends() {
        let backend = backend_with(vec![
            listing_row("low", "t", 100.0, 1, 1, "Loft", "2024-01-01T00:00:00Z"),
            listing_row("mid", "t", 200.0, 1, 1, "Loft", "2024-01-02T00:00:00Z"),
            listing_row("high", "t", 300.0, 1, 1, "Loft", "2024-01-03T00:00:00Z"),
        ])
        .await;

        let filters = SearchFilters {
            min_price: Some(100.0),
            max_price: Some(200.0),
            ..SearchFilters::default()
        };
        let found = search_listings(&backend, &filters).await.unwrap();
        assert_eq!(ids(&found), vec!["mid", "low"]);
        assert!(found.iter().all(|l| (100.0..=200.0).contains(&l.price)));
    }

    #[tokio::test]
    async fn term_matches_any_text_field_case_insensitively() {
        let mut by_title = listing_row("t", "Harbor VIEW", 1.0, 1, 1, "Loft", "2024-01-01T00:00:00Z");
        by_title["description"] = "plain".into();
        let mut by_description = listing_row("d", "Plain", 1.0, 1, 1, "Loft", "2024-01-02T00:00:00Z");
        by_description["description"] = "sweeping harbor views".into();
        let mut by_location = listing_row("l", "Plain", 1.0, 1, 1, "Loft", "2024-01-03T00:00:00Z");
        by_location["location"] = "Harborside".into();
        let unrelated = listing_row("x", "Plain", 1.0, 1, 1, "Loft", "2024-01-04T00:00:00Z");

        let backend = backend_with(vec![by_title, by_description, by_location, unrelated]).await;

        let found = search_by_term(&backend, "HARBOR").await.unwrap();
        assert_eq!(ids(&found), vec!["l", "d", "t"]);
    }

    #[tokio::test]
    async fn term_and_structured_filters_combine_with_and() {
        let backend = backend_with(vec![
            listing_row("cheap", "Sunny loft", 90.0, 1, 1, "Loft", "2024-01-01T00:00:00Z"),
            listing_row("pricey", "Sunny villa", 900.0, 5, 4, "Villa", "2024-01-02T00:00:00Z"),
        ])
        .await;

        let filters = SearchFilters {
            term: Some("sunny".into()),
            max_price: Some(100.0),
            ..SearchFilters::default()
        };
        assert_eq!(ids(&search_listings(&backend, &filters).await.unwrap()), vec!["cheap"]);
    }

    #[tokio::test]
    async fn recent_feed_is_newest_first_and_capped() {
        let rows = (1..=12)
            .map(|day| {
                listing_row(
                    &format!("p{day}"),
                    "t",
                    1.0,
                    1,
                    1,
                    "House",
                    &format!("2024-01-{day:02}T00:00:00Z"),
                )
            })
            .collect();
        let backend = backend_with(rows).await;

        let feed = recent_listings(&backend, DEFAULT_RECENT_LIMIT).await.unwrap();
        assert_eq!(feed.len(), 10);
        assert_eq!(feed[0].id, "p12");
        assert_eq!(feed[9].id, "p3");
    }

    #[tokio::test]
    async fn explore_by_category_and_all() {
        let backend = backend_with(two_listings()).await;

        let villas = listings_by_category(&backend, "Villa").await.unwrap();
        assert_eq!(ids(&villas), vec!["B"]);

        let all = listings_by_category(&backend, "All").await.unwrap();
        assert_eq!(ids(&all), vec!["B", "A"]);
    }

    #[test]
    fn category_selector_is_passed_through_verbatim() {
        let request = ListingQuery::new().category("villa").build();
        assert_eq!(request.filters, vec![Filter::eq("property_type", "villa")]);
    }

    #[tokio::test]
    async fn lowercase_category_rows_are_found_by_exact_selector() {
        let backend = backend_with(vec![
            listing_row("lower", "t", 1.0, 1, 1, "villa", "2024-01-01T00:00:00Z"),
            listing_row("upper", "t", 1.0, 1, 1, "Villa", "2024-01-02T00:00:00Z"),
        ])
        .await;

        assert_eq!(ids(&listings_by_category(&backend, "villa").await.unwrap()), vec!["lower"]);
        assert_eq!(ids(&listings_by_category(&backend, "Villa").await.unwrap()), vec!["upper"]);
    }

    #[tokio::test]
    async fn get_listing_returns_none_for_unknown_id() {
        let backend = backend_with(two_listings()).await;
        assert_eq!(get_listing(&backend, "A").await.unwrap().map(|l| l.price), Some(100_000.0));
        assert!(get_listing(&backend, "missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn backend_failure_is_a_query_failure() {
        let backend = backend_with(two_listings()).await;
        backend.set_offline(true);

        let err = search_listings(&backend, &SearchFilters::default())
            .await
            .unwrap_err();
        assert_eq!(err, AppError::QueryFailure("backend is offline".to_string()));
    }

    #[tokio::test]
    async fn malformed_rows_are_a_query_failure() {
        let backend = backend_with(vec![serde_json::json!({ "id": "broken" })]).await;

        let err = recent_listings(&backend, 5).await.unwrap_err();
        assert!(matches!(err, AppError::QueryFailure(_)));
    }
}
