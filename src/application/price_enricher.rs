//! Danawa price lookups for stored heatsinks

use std::sync::Arc;

use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};
use url::Url;

use crate::domain::corrections::danawa_id;
use crate::domain::{HeatsinkWithMaker, PriceFields};
use crate::infrastructure::config::DanawaConfig;
use crate::infrastructure::cooler_repository::{self as repo, CoolerRepository};
use crate::infrastructure::parsing::{parse_product_info, parse_search_results, ProductSearchResults};
use crate::infrastructure::simple_http_client::HttpFetch;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PriceReport {
    /// Heatsinks with a Danawa product id
    pub checked: usize,
    /// Heatsinks whose price columns were written
    pub updated: usize,
    /// Heatsinks whose product info could not be used
    pub skipped: usize,
}

/// Search hits for one heatsink without a known product id
#[derive(Debug, Clone, Serialize)]
pub struct ProductCandidates {
    pub maker: String,
    pub model: String,
    pub results: ProductSearchResults,
}

pub struct PriceEnricher {
    pool: SqlitePool,
    fetcher: Arc<dyn HttpFetch>,
    config: DanawaConfig,
}

impl PriceEnricher {
    pub fn new(pool: SqlitePool, fetcher: Arc<dyn HttpFetch>, config: DanawaConfig) -> Self {
        Self {
            pool,
            fetcher,
            config,
        }
    }

    /// Refresh product ids and price columns of every heatsink.
    ///
    /// Lookup failures skip the heatsink. All writes happen in one
    /// transaction at the end; a storage error discards every price update.
    pub async fn update_prices(&self) -> Result<PriceReport, sqlx::Error> {
        let mut report = PriceReport::default();
        let Some(api_key) = self.config.product_info_api_key.as_deref() else {
            warn!("Danawa product info API key not found. Price data could not be fetched.");
            return Ok(report);
        };

        let heatsinks = CoolerRepository::new(self.pool.clone())
            .heatsinks_with_maker_names()
            .await?;

        let mut changes: Vec<(i64, PriceFields)> = Vec::new();
        for joined in &heatsinks {
            let current = joined.heatsink.price_fields();
            let mut fields = current.clone();
            if let Some(id) = danawa_id(&joined.lookup_key()) {
                fields.danawa_id = Some(id);
            }

            if let Some(product_id) = fields.danawa_id {
                report.checked += 1;
                if !self.apply_product_info(api_key, product_id, &mut fields).await {
                    report.skipped += 1;
                }
            }

            if fields != current {
                changes.push((joined.heatsink.id, fields));
            }
        }

        let mut tx = self.pool.begin().await?;
        for (id, fields) in &changes {
            repo::update_heatsink_price(&mut tx, *id, fields).await?;
        }
        tx.commit().await?;

        report.updated = changes.len();
        info!(?report, "Updated price data");
        Ok(report)
    }

    /// Fetch the product info and copy usable values into `fields`.
    /// Returns false if the response could not be used.
    async fn apply_product_info(&self, api_key: &str, product_id: i64, fields: &mut PriceFields) -> bool {
        let product_code = product_id.to_string();
        let url = match Url::parse_with_params(
            &self.config.product_info_url,
            &[
                ("key", api_key),
                ("mediatype", "json"),
                ("prodCode", product_code.as_str()),
            ],
        ) {
            Ok(url) => url,
            Err(e) => {
                warn!("Invalid Danawa product info URL {:?}: {}", self.config.product_info_url, e);
                return false;
            }
        };

        let body = match self.fetcher.fetch_text(url.as_str()).await {
            Ok(body) => body,
            Err(e) => {
                warn!("Failed to fetch Danawa product {}: {}", product_id, e);
                return false;
            }
        };
        let Some(info) = parse_product_info(&body).into_data() else {
            return false;
        };

        // Zero means the product has no offers, not a price of zero
        if info.min_price > 0 {
            fields.price = Some(info.min_price);
        }
        if info.shop_count > 0 {
            fields.shop_count = Some(info.shop_count);
        }
        if let Some(input_date) = info.input_date {
            fields.first_seen = Some(input_date);
        }
        if let Some(image_url) = info.large_image_url {
            fields.image_url = Some(image_url);
        }
        debug!("Danawa product {}: {:?}", product_id, fields);
        true
    }

    /// Search Danawa for every heatsink that has no product id yet
    pub async fn search_product_ids(&self) -> Result<Vec<ProductCandidates>, sqlx::Error> {
        let Some(api_key) = self.config.search_api_key.as_deref() else {
            warn!("Danawa search API key not found");
            return Ok(Vec::new());
        };

        let heatsinks = CoolerRepository::new(self.pool.clone())
            .heatsinks_with_maker_names()
            .await?;

        let mut candidates = Vec::new();
        for joined in heatsinks.iter().filter(|h| h.heatsink.danawa_id.is_none()) {
            if let Some(results) = self.search(api_key, joined).await {
                candidates.push(ProductCandidates {
                    maker: joined.maker_name.clone(),
                    model: joined.heatsink.name.clone(),
                    results,
                });
            }
        }
        Ok(candidates)
    }

    async fn search(&self, api_key: &str, joined: &HeatsinkWithMaker) -> Option<ProductSearchResults> {
        let keyword = format!("{} {}", joined.maker_name, joined.heatsink.name);
        let category = self.config.search_category.to_string();
        let url = Url::parse_with_params(
            &self.config.search_url,
            &[
                ("key", api_key),
                ("mediatype", "json"),
                ("keyword", keyword.as_str()),
                ("cate_c1", category.as_str()),
            ],
        )
        .map_err(|e| warn!("Invalid Danawa search URL {:?}: {}", self.config.search_url, e))
        .ok()?;

        match self.fetcher.fetch_text(url.as_str()).await {
            Ok(body) => parse_search_results(&body).into_data(),
            Err(e) => {
                warn!("Danawa search for {:?} failed: {}", keyword, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::HeatsinkSpec;
    use crate::infrastructure::database_connection::DatabaseConnection;
    use crate::infrastructure::simple_http_client::{FetchError, HttpResponse};
    use async_trait::async_trait;
    use chrono::NaiveDate;

    /// Answers with the body of the first route whose pattern the URL contains
    struct RoutedFetcher(Vec<(&'static str, &'static str)>);

    #[async_trait]
    impl HttpFetch for RoutedFetcher {
        async fn get(&self, url: &str) -> Result<HttpResponse, FetchError> {
            self.0
                .iter()
                .find(|(pattern, _)| url.contains(pattern))
                .map(|(_, body)| HttpResponse::ok(*body))
                .ok_or_else(|| FetchError::Transport {
                    url: url.to_string(),
                    message: "no route".to_string(),
                })
        }
    }

    fn config() -> DanawaConfig {
        DanawaConfig {
            product_info_api_key: Some("info-key".to_string()),
            search_api_key: Some("search-key".to_string()),
            ..DanawaConfig::default()
        }
    }

    async fn seed(db: &DatabaseConnection, maker: &str, models: &[&str]) {
        let spec = HeatsinkSpec {
            width: None,
            depth: None,
            height: None,
            heatsink_type: "tower".to_string(),
            weight: None,
        };
        let mut conn = db.pool().acquire().await.unwrap();
        let maker = repo::insert_maker(&mut conn, maker).await.unwrap();
        for model in models {
            repo::insert_heatsink(&mut conn, maker.id, model, &spec).await.unwrap();
        }
    }

    const PRODUCT_JSON: &str = r#"{
        "minPrice": "32000",
        "shopCount": 0,
        "inputDate": "2012-03-05 10:20:30",
        "images": {"image": [
            {"name": "small_1", "url": "http://img/s.jpg"},
            {"name": "large_1", "url": "http://img/l.jpg"}
        ]}
    }"#;

    const ERROR_XML: &str =
        "<?xml version=\"1.0\"?><result><code>300</code><message>invalid key</message></result>";

    #[tokio::test]
    async fn test_prices_are_written_for_mapped_heatsinks() {
        let db = DatabaseConnection::in_memory().await.unwrap();
        db.migrate().await.unwrap();
        // Both are in the product id table
        seed(&db, "3Rsystem", &["iCEAGE 120", "iCEAGE 120 BOSS"]).await;

        let fetcher = RoutedFetcher(vec![
            ("prodCode=451918", PRODUCT_JSON),
            ("prodCode=669681", ERROR_XML),
        ]);
        let enricher = PriceEnricher::new(db.pool().clone(), Arc::new(fetcher), config());
        let report = enricher.update_prices().await.unwrap();
        assert_eq!(report, PriceReport { checked: 2, updated: 2, skipped: 1 });

        let heatsinks = CoolerRepository::new(db.pool().clone()).list_heatsinks().await.unwrap();
        let priced = heatsinks.iter().find(|h| h.name == "iCEAGE 120").unwrap();
        assert_eq!(priced.danawa_id, Some(451918));
        assert_eq!(priced.price, Some(32000));
        assert_eq!(priced.shop_count, None);
        assert_eq!(
            priced.first_seen,
            NaiveDate::from_ymd_opt(2012, 3, 5).unwrap().and_hms_opt(10, 20, 30)
        );
        assert_eq!(priced.image_url.as_deref(), Some("http://img/l.jpg"));

        // The failed lookup still records the product id
        let failed = heatsinks.iter().find(|h| h.name == "iCEAGE 120 BOSS").unwrap();
        assert_eq!(failed.danawa_id, Some(669681));
        assert_eq!(failed.price, None);
    }

    #[tokio::test]
    async fn test_missing_api_key_skips_enrichment() {
        let db = DatabaseConnection::in_memory().await.unwrap();
        db.migrate().await.unwrap();
        seed(&db, "3Rsystem", &["iCEAGE 120"]).await;

        let enricher = PriceEnricher::new(
            db.pool().clone(),
            Arc::new(RoutedFetcher(vec![])),
            DanawaConfig::default(),
        );
        assert_eq!(enricher.update_prices().await.unwrap(), PriceReport::default());
        let heatsinks = CoolerRepository::new(db.pool().clone()).list_heatsinks().await.unwrap();
        assert_eq!(heatsinks[0].danawa_id, None);
    }

    #[tokio::test]
    async fn test_search_lists_candidates_for_unmapped_heatsinks() {
        let db = DatabaseConnection::in_memory().await.unwrap();
        db.migrate().await.unwrap();
        seed(&db, "Nobody", &["Prototype"]).await;

        let fetcher = RoutedFetcher(vec![(
            "keyword=Nobody+Prototype",
            r#"{"totalCount": "1", "productList": {"maker": "Nobody", "prod_name": "Prototype X", "prod_id": "123", "min_price": "9900"}}"#,
        )]);
        let enricher = PriceEnricher::new(db.pool().clone(), Arc::new(fetcher), config());
        let candidates = enricher.search_product_ids().await.unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].results.total_count, 1);
        assert_eq!(candidates[0].results.products[0].prod_id, "123");
    }
}
