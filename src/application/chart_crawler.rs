//! Fetches and parses the whole noise × power grid of the chart

use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info};

use crate::domain::{grid_cells, sort_records, CoolerRecord, GridCell};
use crate::infrastructure::parsing::{ChartPageContext, ChartTableParser, ParsingError, WarningLog};
use crate::infrastructure::simple_http_client::{FetchError, HttpFetch};

#[derive(Error, Debug)]
pub enum CrawlError {
    #[error("Failed to fetch chart page (noise={noise}, power={power}): {source}")]
    Fetch {
        noise: i64,
        power: i64,
        #[source]
        source: FetchError,
    },

    #[error(transparent)]
    Parse(#[from] ParsingError),
}

pub struct ChartCrawler {
    fetcher: Arc<dyn HttpFetch>,
    parser: ChartTableParser,
    chart_url: String,
}

impl ChartCrawler {
    /// `chart_url` must contain `{noise}` and `{power}` placeholders
    pub fn new(fetcher: Arc<dyn HttpFetch>, chart_url: impl Into<String>) -> Result<Self, ParsingError> {
        Ok(Self {
            fetcher,
            parser: ChartTableParser::new()?,
            chart_url: chart_url.into(),
        })
    }

    pub fn chart_page_url(&self, cell: &GridCell) -> String {
        self.chart_url
            .replace("{noise}", &cell.noise_code.to_string())
            .replace("{power}", &cell.power_code.to_string())
    }

    /// Fetch every grid cell and return the records in canonical order.
    ///
    /// Returns an empty list if any page fails to fetch or parse; a partial
    /// grid is never returned. Clears `warnings` first.
    pub async fn fetch_measurement_data(&self, warnings: &mut WarningLog) -> Vec<CoolerRecord> {
        warnings.reset();
        match self.try_fetch_measurement_data(warnings).await {
            Ok(records) => records,
            Err(e) => {
                error!("Measurement data could not be fetched: {}", e);
                Vec::new()
            }
        }
    }

    /// Like [`Self::fetch_measurement_data`] but reports why the cycle failed
    pub async fn try_fetch_measurement_data(
        &self,
        warnings: &mut WarningLog,
    ) -> Result<Vec<CoolerRecord>, CrawlError> {
        let mut records = Vec::new();
        for cell in grid_cells() {
            let url = self.chart_page_url(&cell);
            let html = self
                .fetcher
                .fetch_text(&url)
                .await
                .map_err(|source| CrawlError::Fetch {
                    noise: cell.noise,
                    power: cell.power,
                    source,
                })?;
            let context = ChartPageContext::new(cell, url);
            records.extend(self.parser.parse_page(&html, &context, warnings)?);
        }

        sort_records(&mut records);
        info!("Fetched {} measurement records", records.len());
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::simple_http_client::HttpResponse;
    use async_trait::async_trait;
    use std::sync::Mutex;

    const CHART_URL: &str = "http://chart/?dd={noise}&test={power}";

    /// Serves one row per page; the maker encodes the page's query codes
    struct GridFetcher {
        fail_on: Option<&'static str>,
        requested: Mutex<Vec<String>>,
    }

    impl GridFetcher {
        fn new(fail_on: Option<&'static str>) -> Self {
            Self {
                fail_on,
                requested: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl HttpFetch for GridFetcher {
        async fn get(&self, url: &str) -> Result<HttpResponse, FetchError> {
            self.requested.lock().unwrap().push(url.to_string());
            if self.fail_on.is_some_and(|q| url.ends_with(q)) {
                return Err(FetchError::Transport {
                    url: url.to_string(),
                    message: "connection reset".to_string(),
                });
            }
            let noise_cell = if url.contains("dd=1&") { "<td>40.5</td>" } else { "" };
            Ok(HttpResponse::ok(format!(
                r#"<table width="680" bordercolorlight="black">
                  <tr class="tdm">
                    <td>Zalman<br>CNPS10X</td>
                    <td>125 x 75 x 150<br>Tower / 620g</td>
                    <td>120/25T<br>1200 rpm</td>
                    {noise_cell}
                    <td><font>40.0</font><font>30.0</font></td>
                  </tr>
                </table>"#
            )))
        }
    }

    #[test]
    fn test_chart_page_url_uses_query_codes() {
        let crawler = ChartCrawler::new(Arc::new(GridFetcher::new(None)), CHART_URL).unwrap();
        let cell = grid_cells()[0];
        assert_eq!(crawler.chart_page_url(&cell), "http://chart/?dd=4&test=1");
    }

    #[tokio::test]
    async fn test_fetches_every_cell_in_order() {
        let fetcher = Arc::new(GridFetcher::new(None));
        let crawler = ChartCrawler::new(fetcher.clone(), CHART_URL).unwrap();

        let records = crawler.fetch_measurement_data(&mut WarningLog::new()).await;
        assert_eq!(records.len(), 14);
        assert!(records.windows(2).all(|w| w[0].canonical_cmp(&w[1]).is_le()));

        let requested = fetcher.requested.lock().unwrap();
        assert_eq!(requested.len(), 14);
        assert_eq!(requested[0], "http://chart/?dd=4&test=1");
        assert_eq!(requested[13], "http://chart/?dd=1&test=4");
    }

    #[tokio::test]
    async fn test_one_failed_cell_discards_the_whole_grid() {
        let fetcher = Arc::new(GridFetcher::new(Some("dd=2&test=3")));
        let crawler = ChartCrawler::new(fetcher.clone(), CHART_URL).unwrap();

        let err = crawler
            .try_fetch_measurement_data(&mut WarningLog::new())
            .await
            .unwrap_err();
        assert!(matches!(err, CrawlError::Fetch { noise: 45, power: 150, .. }));

        let records = crawler.fetch_measurement_data(&mut WarningLog::new()).await;
        assert!(records.is_empty());
    }
}
