use async_trait::async_trait;
use bigdecimal::BigDecimal;
use reqwest::Client;
use serde_json::Value;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::config::PriceFeedSettings;
use crate::error::AppError;
use crate::utils::math::average_open_close;
use crate::utils::time::TimeWindow;
use crate::utils::RateLimiter;

pub const INTERVAL_1MIN: &str = "1m";

const OPEN_INDEX: usize = 1;
const CLOSE_INDEX: usize = 4;

/// Average market price source.
#[async_trait]
pub trait PriceFeed: Send + Sync {
    /// Mean of open and close over every candle in `window`.
    /// Fails with `NotFound("price not found")` when the window has no candles.
    async fn query_average_price(
        &self,
        pair: &str,
        interval: &str,
        window: TimeWindow,
    ) -> Result<BigDecimal, AppError>;
}

/// Binance-compatible klines client.
pub struct PriceFeedClient {
    client: Client,
    base_url: Url,
    rate_limiter: Arc<RateLimiter>,
}

impl PriceFeedClient {
    pub fn new(settings: &PriceFeedSettings) -> Result<Self, AppError> {
        let rate_limiter = Arc::new(RateLimiter::per_second(
            "price_feed",
            settings.requests_per_second,
        ));
        Self::with_rate_limiter(&settings.base_url, rate_limiter)
    }

    pub fn with_rate_limiter(
        base_url: &str,
        rate_limiter: Arc<RateLimiter>,
    ) -> Result<Self, AppError> {
        let base_url = base_url
            .parse::<Url>()
            .map_err(|e| AppError::ConfigError(format!("Invalid price feed URL: {}", e)))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .user_agent("Pool-Fee-Tracker/1.0")
            .build()
            .map_err(|e| AppError::InternalError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            rate_limiter,
        })
    }
}

#[async_trait]
impl PriceFeed for PriceFeedClient {
    async fn query_average_price(
        &self,
        pair: &str,
        interval: &str,
        window: TimeWindow,
    ) -> Result<BigDecimal, AppError> {
        self.rate_limiter.acquire().await;

        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("symbol", pair)
            .append_pair("interval", interval)
            .append_pair("startTime", &window.start_millis().to_string())
            .append_pair("endTime", &window.end_millis().to_string());
        debug!(url = %url, "Price feed request");

        let response = self.client.get(url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!(status = %status, pair, "Price feed returned non-success status");
            return Err(AppError::UpstreamError(format!(
                "price feed returned status {}: {}",
                status, body
            )));
        }

        let candles: Vec<Vec<Value>> = serde_json::from_str(&body)?;
        let samples = candles
            .iter()
            .map(|candle| parse_open_close(candle))
            .collect::<Result<Vec<_>, _>>()?;

        average_open_close(&samples)
            .ok_or_else(|| AppError::NotFound("price not found".to_string()))
    }
}

fn parse_open_close(candle: &[Value]) -> Result<(BigDecimal, BigDecimal), AppError> {
    let field = |index: usize, name: &str| -> Result<BigDecimal, AppError> {
        let raw = candle
            .get(index)
            .and_then(Value::as_str)
            .ok_or_else(|| AppError::DecodeError(format!("candle has no {} price", name)))?;
        BigDecimal::from_str(raw)
            .map_err(|e| AppError::DecodeError(format!("invalid {} price {:?}: {}", name, raw, e)))
    };

    Ok((field(OPEN_INDEX, "open")?, field(CLOSE_INDEX, "close")?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const WINDOW: TimeWindow = TimeWindow {
        start: 1_609_459_200,
        end: 1_609_545_600,
    };

    async fn client_for(server: &MockServer) -> PriceFeedClient {
        let limiter = Arc::new(RateLimiter::per_second("price-test", 100));
        let base_url = format!("{}/api/v3/klines", server.uri());
        PriceFeedClient::with_rate_limiter(&base_url, limiter).unwrap()
    }

    #[tokio::test]
    async fn test_average_price() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v3/klines"))
            .and(query_param("symbol", "ETHUSDT"))
            .and(query_param("interval", "1m"))
            .and(query_param("startTime", "1609459200000"))
            .and(query_param("endTime", "1609545600000"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(r#"[["", "100.5", "", "", "101.5"]]"#),
            )
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let price = client
            .query_average_price("ETHUSDT", INTERVAL_1MIN, WINDOW)
            .await
            .unwrap();
        assert_eq!(price, BigDecimal::from(101));
    }

    #[tokio::test]
    async fn test_average_over_real_candle_shape() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"[
                    [1609459200000, "2000.00", "2010.00", "1990.00", "2004.00", "10.5",
                     1609459259999, "0", 12, "0", "0", "0"],
                    [1609459260000, "2004.00", "2012.00", "2001.00", "2008.00", "8.1",
                     1609459319999, "0", 9, "0", "0", "0"]
                ]"#,
            ))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let price = client
            .query_average_price("ETHUSDT", INTERVAL_1MIN, WINDOW)
            .await
            .unwrap();
        assert_eq!(price, BigDecimal::from(2004));
    }

    #[tokio::test]
    async fn test_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let err = client
            .query_average_price("ETHUSDT", INTERVAL_1MIN, WINDOW)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UpstreamError(_)), "{:?}", err);
    }

    #[tokio::test]
    async fn test_no_candles() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let err = client
            .query_average_price("ETHUSDT", INTERVAL_1MIN, WINDOW)
            .await
            .unwrap_err();
        assert!(
            matches!(err, AppError::NotFound(ref msg) if msg == "price not found"),
            "{:?}",
            err
        );
    }

    #[tokio::test]
    async fn test_malformed_candle() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(r#"[["", "abc", "", "", "1"]]"#),
            )
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let err = client
            .query_average_price("ETHUSDT", INTERVAL_1MIN, WINDOW)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DecodeError(_)), "{:?}", err);
    }

    #[tokio::test]
    async fn test_short_candle() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"[["", "1"]]"#))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let err = client
            .query_average_price("ETHUSDT", INTERVAL_1MIN, WINDOW)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DecodeError(_)), "{:?}", err);
    }
}
