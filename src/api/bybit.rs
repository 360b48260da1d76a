use std::num::NonZeroU32;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use governor::{Quota, RateLimiter};
use hmac::{Hmac, Mac};
use reqwest::{Client, Method, StatusCode, Url};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use sha2::Sha256;
use tracing::{debug, info};

use super::{venue_symbol, VenueClient};
use crate::config::VenueConfig;
use crate::error::{ConnectivityError, SubmitError};
use crate::models::{Candle, MarketRules, OrderRequest, OrderStatus, Side, Timeframe, VenueOrder};
use crate::Result;

type HmacSha256 = Hmac<Sha256>;

type BybitRateLimiter = RateLimiter<
    governor::state::direct::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

// retCodes meaning the key, signature or permissions are wrong
const AUTH_RET_CODES: [i64; 4] = [10003, 10004, 10005, 33004];
const CATEGORY: &str = "spot";

/// Bybit v5 REST client (spot)
///
/// Cloneable; clones share the HTTP pool, the rate limiter and the active
/// endpoint. Requests go to the active endpoint; `probe` walks the whole
/// endpoint list and switches to the first one that answers.
#[derive(Clone)]
pub struct BybitClient {
    client: Client,
    endpoints: Arc<Vec<String>>,
    active: Arc<AtomicUsize>,
    api_key: Option<String>,
    api_secret: Option<String>,
    recv_window_ms: u64,
    account_type: String,
    quote_coin: String,
    rate_limiter: Arc<BybitRateLimiter>,
}

/// Common response envelope
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope<T> {
    ret_code: i64,
    ret_msg: String,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ListResult<T> {
    list: Vec<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TickerEntry {
    last_price: String,
}

#[derive(Debug, Deserialize)]
struct WalletEntry {
    coin: Vec<CoinBalance>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CoinBalance {
    coin: String,
    wallet_balance: String,
    #[serde(default)]
    locked: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InstrumentEntry {
    lot_size_filter: LotSizeFilter,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LotSizeFilter {
    base_precision: String,
    min_order_qty: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateOrderResult {
    order_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServerTime {
    time_second: String,
}

/// How an HTTP response should be interpreted
enum Outcome<T> {
    Ok(T),
    /// Venue answered with a non-zero retCode that is not an auth failure
    Refused { code: i64, message: String },
}

impl BybitClient {
    pub fn new(config: &VenueConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        let per_second = NonZeroU32::new(config.rate_limit_per_sec).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = Arc::new(RateLimiter::direct(Quota::per_second(per_second)));

        Ok(Self {
            client,
            endpoints: Arc::new(config.endpoints()),
            active: Arc::new(AtomicUsize::new(0)),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            api_secret: config.api_secret.clone().filter(|s| !s.is_empty()),
            recv_window_ms: config.recv_window_ms,
            account_type: config.account_type.clone(),
            quote_coin: config.quote_coin.clone(),
            rate_limiter,
        })
    }

    /// Endpoint currently used for requests
    pub fn base_url(&self) -> &str {
        let index = self.active.load(Ordering::Relaxed).min(self.endpoints.len().saturating_sub(1));
        self.endpoints.get(index).map(String::as_str).unwrap_or_default()
    }

    /// Hex HMAC-SHA256 over `timestamp + api_key + recv_window + payload`
    pub fn sign(secret: &str, timestamp: i64, api_key: &str, recv_window: u64, payload: &str) -> String {
        // HMAC accepts keys of any length
        let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
            Ok(mac) => mac,
            Err(_) => return String::new(),
        };
        mac.update(format!("{}{}{}{}", timestamp, api_key, recv_window, payload).as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    async fn request<T: DeserializeOwned>(
        &self,
        base: &str,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<serde_json::Value>,
        signed: bool,
    ) -> std::result::Result<Outcome<T>, ConnectivityError> {
        self.rate_limiter.until_ready().await;

        let (url, query_string) = build_url(base, path, query)?;
        let body_string = body.as_ref().map(|b| b.to_string()).unwrap_or_default();

        let mut builder = self.client.request(method.clone(), url);
        if body.is_some() {
            builder = builder
                .header("Content-Type", "application/json")
                .body(body_string.clone());
        }

        if signed {
            let (key, secret) = match (&self.api_key, &self.api_secret) {
                (Some(key), Some(secret)) => (key, secret),
                _ => return Err(ConnectivityError::Auth("API credentials not configured".into())),
            };
            let timestamp = Utc::now().timestamp_millis();
            let payload = if method == Method::GET { &query_string } else { &body_string };
            let signature = Self::sign(secret, timestamp, key, self.recv_window_ms, payload);

            builder = builder
                .header("X-BAPI-API-KEY", key)
                .header("X-BAPI-TIMESTAMP", timestamp.to_string())
                .header("X-BAPI-RECV-WINDOW", self.recv_window_ms.to_string())
                .header("X-BAPI-SIGN", signature);
        }

        debug!(path = %path, signed, "Bybit request");
        let response = builder.send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ConnectivityError::Auth(format!("HTTP {} from {}", status, path)));
        }
        if !status.is_success() {
            return Err(ConnectivityError::Transport(format!("HTTP {} from {}", status, path)));
        }

        // Error responses carry an empty result object, so decode it only on success
        let envelope: Envelope<serde_json::Value> = response
            .json()
            .await
            .map_err(|e| ConnectivityError::Malformed(format!("{}: {}", path, e)))?;

        if envelope.ret_code != 0 {
            if AUTH_RET_CODES.contains(&envelope.ret_code) {
                return Err(ConnectivityError::Auth(envelope.ret_msg));
            }
            return Ok(Outcome::Refused {
                code: envelope.ret_code,
                message: envelope.ret_msg,
            });
        }

        let result = envelope
            .result
            .ok_or_else(|| ConnectivityError::Malformed(format!("{}: missing result", path)))?;
        serde_json::from_value(result)
            .map(Outcome::Ok)
            .map_err(|e| ConnectivityError::Malformed(format!("{}: {}", path, e)))
    }

    /// Request where any refusal is a connectivity problem
    async fn fetch<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        signed: bool,
    ) -> std::result::Result<T, ConnectivityError> {
        match self.request(self.base_url(), Method::GET, path, query, None, signed).await? {
            Outcome::Ok(value) => Ok(value),
            Outcome::Refused { code, message } => Err(ConnectivityError::Api { code, message }),
        }
    }
}

/// Request URL plus its encoded query string, which is also the signed payload
fn build_url(
    base: &str,
    path: &str,
    query: &[(&str, String)],
) -> std::result::Result<(Url, String), ConnectivityError> {
    let mut url = Url::parse(&format!("{}{}", base, path))
        .map_err(|e| ConnectivityError::Transport(format!("invalid URL {}{}: {}", base, path, e)))?;
    if !query.is_empty() {
        url.query_pairs_mut()
            .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
    }

    let query_string = url.query().unwrap_or_default().to_string();
    Ok((url, query_string))
}

fn interval_param(timeframe: Timeframe) -> &'static str {
    match timeframe {
        Timeframe::M1 => "1",
        Timeframe::M5 => "5",
        Timeframe::M15 => "15",
        Timeframe::H1 => "60",
        Timeframe::H4 => "240",
        Timeframe::D1 => "D",
    }
}

fn parse_f64(value: &str, field: &str) -> std::result::Result<f64, ConnectivityError> {
    value
        .parse::<f64>()
        .map_err(|_| ConnectivityError::Malformed(format!("{} is not a number: '{}'", field, value)))
}

fn parse_decimal(value: &str, field: &str) -> std::result::Result<Decimal, ConnectivityError> {
    Decimal::from_str(value)
        .map_err(|_| ConnectivityError::Malformed(format!("{} is not a decimal: '{}'", field, value)))
}

/// Kline rows are `[startTime, open, high, low, close, volume, turnover]`
fn parse_kline(row: &[String]) -> std::result::Result<Candle, ConnectivityError> {
    if row.len() < 6 {
        return Err(ConnectivityError::Malformed(format!("kline row has {} fields", row.len())));
    }

    let millis = row[0]
        .parse::<i64>()
        .map_err(|_| ConnectivityError::Malformed(format!("bad kline timestamp '{}'", row[0])))?;
    let timestamp = DateTime::<Utc>::from_timestamp_millis(millis)
        .ok_or_else(|| ConnectivityError::Malformed(format!("kline timestamp out of range: {}", millis)))?;

    Ok(Candle {
        timestamp,
        open: parse_f64(&row[1], "open")?,
        high: parse_f64(&row[2], "high")?,
        low: parse_f64(&row[3], "low")?,
        close: parse_f64(&row[4], "close")?,
        volume: parse_f64(&row[5], "volume")?,
    })
}

#[async_trait]
impl VenueClient for BybitClient {
    async fn fetch_candles(
        &self,
        pair: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> std::result::Result<Vec<Candle>, ConnectivityError> {
        let query = [
            ("category", CATEGORY.to_string()),
            ("symbol", venue_symbol(pair)),
            ("interval", interval_param(timeframe).to_string()),
            ("limit", limit.to_string()),
        ];
        let result: ListResult<Vec<String>> = self.fetch("/v5/market/kline", &query, false).await?;

        // Venue returns newest first
        let mut candles = result
            .list
            .iter()
            .map(|row| parse_kline(row))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        candles.sort_by_key(|c| c.timestamp);
        Ok(candles)
    }

    async fn fetch_ticker(&self, pair: &str) -> std::result::Result<f64, ConnectivityError> {
        let query = [("category", CATEGORY.to_string()), ("symbol", venue_symbol(pair))];
        let result: ListResult<TickerEntry> = self.fetch("/v5/market/tickers", &query, false).await?;

        let entry = result
            .list
            .first()
            .ok_or_else(|| ConnectivityError::Malformed(format!("no ticker for {}", pair)))?;
        parse_f64(&entry.last_price, "lastPrice")
    }

    async fn fetch_balance(&self) -> std::result::Result<f64, ConnectivityError> {
        let query = [
            ("accountType", self.account_type.clone()),
            ("coin", self.quote_coin.clone()),
        ];
        let result: ListResult<WalletEntry> = self.fetch("/v5/account/wallet-balance", &query, true).await?;

        let coin = result
            .list
            .iter()
            .flat_map(|w| w.coin.iter())
            .find(|c| c.coin.eq_ignore_ascii_case(&self.quote_coin));

        match coin {
            Some(coin) => {
                let total = parse_f64(&coin.wallet_balance, "walletBalance")?;
                let locked = if coin.locked.is_empty() {
                    0.0
                } else {
                    parse_f64(&coin.locked, "locked")?
                };
                Ok((total - locked).max(0.0))
            }
            // Coin absent from the wallet means nothing to spend
            None => Ok(0.0),
        }
    }

    async fn fetch_market_rules(&self, pair: &str) -> std::result::Result<MarketRules, ConnectivityError> {
        let query = [("category", CATEGORY.to_string()), ("symbol", venue_symbol(pair))];
        let result: ListResult<InstrumentEntry> =
            self.fetch("/v5/market/instruments-info", &query, false).await?;

        let entry = result
            .list
            .first()
            .ok_or_else(|| ConnectivityError::Malformed(format!("no instrument for {}", pair)))?;

        Ok(MarketRules {
            pair: pair.to_string(),
            qty_step: parse_decimal(&entry.lot_size_filter.base_precision, "basePrecision")?,
            min_qty: parse_decimal(&entry.lot_size_filter.min_order_qty, "minOrderQty")?,
        })
    }

    async fn submit_market_order(&self, order: &OrderRequest) -> std::result::Result<VenueOrder, SubmitError> {
        let side = match order.side {
            Side::Buy => "Buy",
            Side::Sell => "Sell",
        };
        let body = serde_json::json!({
            "category": CATEGORY,
            "symbol": venue_symbol(&order.pair),
            "side": side,
            "orderType": "Market",
            "qty": order.quantity.normalize().to_string(),
            "marketUnit": "baseCoin",
            "orderLinkId": order.client_order_id,
        });

        match self
            .request::<CreateOrderResult>(self.base_url(), Method::POST, "/v5/order/create", &[], Some(body), true)
            .await?
        {
            Outcome::Ok(created) => Ok(VenueOrder {
                order_id: created.order_id,
                status: OrderStatus::Accepted,
                fill_price: None,
            }),
            Outcome::Refused { code, message } => {
                Err(SubmitError::Rejected(format!("{} (retCode {})", message, code)))
            }
        }
    }

    /// Server time on the active endpoint, then on each alternate in turn
    async fn probe(&self) -> std::result::Result<(), ConnectivityError> {
        let current = self.active.load(Ordering::Relaxed);
        let count = self.endpoints.len();
        let mut last_error = None;

        for index in (0..count).map(|k| (current + k) % count) {
            let base = self.endpoints[index].as_str();
            let error = match self
                .request::<ServerTime>(base, Method::GET, "/v5/market/time", &[], None, false)
                .await
            {
                Ok(Outcome::Ok(time)) => {
                    if index != current {
                        self.active.store(index, Ordering::Relaxed);
                        info!(endpoint = %base, "🔀 Switched Bybit endpoint");
                    }
                    debug!(endpoint = %base, server_time = %time.time_second, "Bybit probe ok");
                    return Ok(());
                }
                Ok(Outcome::Refused { code, message }) => ConnectivityError::Api { code, message },
                Err(e) => e,
            };

            debug!(endpoint = %base, error = %error, "Bybit endpoint unreachable");
            last_error = Some(error);
        }

        Err(last_error.unwrap_or_else(|| ConnectivityError::Transport("no Bybit endpoint configured".into())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn client_for(server: &mockito::Server, with_keys: bool) -> BybitClient {
        let config = VenueConfig {
            base_url: Some(server.url()),
            api_key: with_keys.then(|| "test-key".to_string()),
            api_secret: with_keys.then(|| "test-secret".to_string()),
            rate_limit_per_sec: 100,
            ..VenueConfig::default()
        };
        BybitClient::new(&config).unwrap()
    }

    #[test]
    fn test_sign_is_deterministic_hex() {
        let a = BybitClient::sign("secret", 1_700_000_000_000, "key", 5000, "category=spot");
        let b = BybitClient::sign("secret", 1_700_000_000_000, "key", 5000, "category=spot");
        let c = BybitClient::sign("secret", 1_700_000_000_001, "key", 5000, "category=spot");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|ch| ch.is_ascii_hexdigit()));
    }

    #[test]
    fn test_interval_param() {
        assert_eq!(interval_param(Timeframe::M15), "15");
        assert_eq!(interval_param(Timeframe::H4), "240");
        assert_eq!(interval_param(Timeframe::D1), "D");
    }

    #[tokio::test]
    async fn test_fetch_candles_oldest_first() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v5/market/kline")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("symbol".into(), "BTCUSDT".into()),
                Matcher::UrlEncoded("interval".into(), "15".into()),
                Matcher::UrlEncoded("limit".into(), "2".into()),
            ]))
            .with_status(200)
            .with_body(
                r#"{"retCode":0,"retMsg":"OK","result":{"symbol":"BTCUSDT","category":"spot","list":[
                    ["1700000900000","101","103","100","102","12.5","1275"],
                    ["1700000000000","100","102","99","101","10","1010"]
                ]},"time":1700000901000}"#,
            )
            .create_async()
            .await;

        let client = client_for(&server, false);
        let candles = client.fetch_candles("BTC/USDT", Timeframe::M15, 2).await.unwrap();

        mock.assert_async().await;
        assert_eq!(candles.len(), 2);
        assert!(candles[0].timestamp < candles[1].timestamp);
        assert_eq!(candles[1].close, 102.0);
        assert_eq!(candles[0].volume, 10.0);
    }

    #[tokio::test]
    async fn test_fetch_ticker() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v5/market/tickers")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"retCode":0,"retMsg":"OK","result":{"category":"spot","list":[{"symbol":"XRPUSDT","lastPrice":"0.5123"}]}}"#)
            .create_async()
            .await;

        let client = client_for(&server, false);
        assert_eq!(client.fetch_ticker("XRP/USDT").await.unwrap(), 0.5123);
    }

    #[tokio::test]
    async fn test_fetch_balance_is_signed() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v5/account/wallet-balance")
            .match_query(Matcher::Any)
            .match_header("X-BAPI-API-KEY", "test-key")
            .match_header("X-BAPI-SIGN", Matcher::Regex("^[0-9a-f]{64}$".into()))
            .with_status(200)
            .with_body(
                r#"{"retCode":0,"retMsg":"OK","result":{"list":[{"accountType":"UNIFIED","coin":[
                    {"coin":"USDT","walletBalance":"120.5","locked":"20.5"}
                ]}]}}"#,
            )
            .create_async()
            .await;

        let client = client_for(&server, true);
        assert_eq!(client.fetch_balance().await.unwrap(), 100.0);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_signed_call_without_keys_is_auth_error() {
        let server = mockito::Server::new_async().await;
        let client = client_for(&server, false);

        let err = client.fetch_balance().await.unwrap_err();
        assert!(err.is_auth());
    }

    #[tokio::test]
    async fn test_auth_ret_code() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v5/account/wallet-balance")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"retCode":10003,"retMsg":"API key is invalid.","result":{}}"#)
            .create_async()
            .await;

        let client = client_for(&server, true);
        let err = client.fetch_balance().await.unwrap_err();
        assert_eq!(err, ConnectivityError::Auth("API key is invalid.".to_string()));
    }

    #[tokio::test]
    async fn test_market_rules() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v5/market/instruments-info")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(
                r#"{"retCode":0,"retMsg":"OK","result":{"category":"spot","list":[{"symbol":"BTCUSDT",
                    "lotSizeFilter":{"basePrecision":"0.000001","quotePrecision":"0.00000001","minOrderQty":"0.000048","maxOrderQty":"71.73956243"}}]}}"#,
            )
            .create_async()
            .await;

        let client = client_for(&server, false);
        let rules = client.fetch_market_rules("BTC/USDT").await.unwrap();
        assert_eq!(rules.qty_step, Decimal::new(1, 6));
        assert_eq!(rules.min_qty, Decimal::new(48, 6));
    }

    #[tokio::test]
    async fn test_submit_order_accepted() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v5/order/create")
            .match_body(Matcher::PartialJsonString(
                r#"{"symbol":"BTCUSDT","side":"Buy","orderType":"Market","qty":"0.0002","orderLinkId":"abc"}"#.into(),
            ))
            .with_status(200)
            .with_body(r#"{"retCode":0,"retMsg":"OK","result":{"orderId":"1234","orderLinkId":"abc"}}"#)
            .create_async()
            .await;

        let client = client_for(&server, true);
        let order = OrderRequest {
            pair: "BTC/USDT".to_string(),
            side: Side::Buy,
            quantity: Decimal::new(2, 4),
            client_order_id: "abc".to_string(),
        };
        let venue_order = client.submit_market_order(&order).await.unwrap();

        mock.assert_async().await;
        assert_eq!(venue_order.order_id, "1234");
        assert_eq!(venue_order.status, OrderStatus::Accepted);
    }

    #[tokio::test]
    async fn test_submit_order_rejected() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v5/order/create")
            .with_status(200)
            .with_body(r#"{"retCode":170131,"retMsg":"Insufficient balance.","result":{}}"#)
            .create_async()
            .await;

        let client = client_for(&server, true);
        let order = OrderRequest {
            pair: "BTC/USDT".to_string(),
            side: Side::Sell,
            quantity: Decimal::new(1, 3),
            client_order_id: "xyz".to_string(),
        };
        let err = client.submit_market_order(&order).await.unwrap_err();
        assert!(matches!(err, SubmitError::Rejected(ref msg) if msg.contains("Insufficient balance")));
    }

    #[tokio::test]
    async fn test_server_error_is_transport() {
        let mut server = mockito::Server::new_async().await;
        server.mock("GET", "/v5/market/time").with_status(503).create_async().await;

        let client = client_for(&server, false);
        assert!(matches!(client.probe().await, Err(ConnectivityError::Transport(_))));
    }

    #[tokio::test]
    async fn test_malformed_payload() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v5/market/time")
            .with_status(200)
            .with_body("<html>maintenance</html>")
            .create_async()
            .await;

        let client = client_for(&server, false);
        assert!(matches!(client.probe().await, Err(ConnectivityError::Malformed(_))));
    }

    #[tokio::test]
    async fn test_probe_ok() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v5/market/time")
            .with_status(200)
            .with_body(r#"{"retCode":0,"retMsg":"OK","result":{"timeSecond":"1700000000","timeNano":"1700000000000000000"}}"#)
            .create_async()
            .await;

        let client = client_for(&server, false);
        assert!(client.probe().await.is_ok());
    }

    #[test]
    fn test_signed_query_matches_request_url() {
        let query = [("category", "spot".to_string()), ("coin", "a b/c&d".to_string())];
        let (url, signed) = build_url("https://api.bybit.com", "/v5/account/wallet-balance", &query).unwrap();

        assert_eq!(signed, "category=spot&coin=a+b%2Fc%26d");
        assert_eq!(url.query(), Some(signed.as_str()));
        assert_eq!(url.path(), "/v5/account/wallet-balance");

        let (url, signed) = build_url("https://api.bybit.com", "/v5/market/time", &[]).unwrap();
        assert_eq!(signed, "");
        assert_eq!(url.query(), None);

        assert!(matches!(
            build_url("not a url", "/v5/market/time", &[]),
            Err(ConnectivityError::Transport(_))
        ));
    }

    fn failover_client(primary: &mockito::Server, alternate: &mockito::Server) -> BybitClient {
        let config = VenueConfig {
            base_url: Some(primary.url()),
            fallback_urls: vec![alternate.url()],
            rate_limit_per_sec: 100,
            ..VenueConfig::default()
        };
        BybitClient::new(&config).unwrap()
    }

    const SERVER_TIME: &str = r#"{"retCode":0,"retMsg":"OK","result":{"timeSecond":"1700000000","timeNano":"1700000000000000000"}}"#;

    #[tokio::test]
    async fn test_unreachable_endpoint_fails_over_to_alternate() {
        let mut primary = mockito::Server::new_async().await;
        let mut alternate = mockito::Server::new_async().await;
        primary
            .mock("GET", "/v5/market/time")
            .with_status(503)
            .create_async()
            .await;
        alternate
            .mock("GET", "/v5/market/time")
            .with_status(200)
            .with_body(SERVER_TIME)
            .create_async()
            .await;
        let ticker = alternate
            .mock("GET", "/v5/market/tickers")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"retCode":0,"retMsg":"OK","result":{"category":"spot","list":[{"symbol":"XRPUSDT","lastPrice":"0.5123"}]}}"#)
            .create_async()
            .await;

        let client = failover_client(&primary, &alternate);
        assert_eq!(client.base_url(), primary.url());

        assert!(client.probe().await.is_ok());
        assert_eq!(client.base_url(), alternate.url());

        // Clones share the switch and later calls go to the alternate
        let shared = client.clone();
        assert_eq!(shared.fetch_ticker("XRP/USDT").await.unwrap(), 0.5123);
        ticker.assert_async().await;
    }

    #[tokio::test]
    async fn test_all_endpoints_down_keeps_active_endpoint() {
        let mut primary = mockito::Server::new_async().await;
        let mut alternate = mockito::Server::new_async().await;
        primary
            .mock("GET", "/v5/market/time")
            .with_status(503)
            .create_async()
            .await;
        alternate
            .mock("GET", "/v5/market/time")
            .with_status(502)
            .create_async()
            .await;

        let client = failover_client(&primary, &alternate);
        assert!(matches!(client.probe().await, Err(ConnectivityError::Transport(_))));
        assert_eq!(client.base_url(), primary.url());
    }

    #[tokio::test]
    async fn test_healthy_primary_is_kept() {
        let mut primary = mockito::Server::new_async().await;
        let mut alternate = mockito::Server::new_async().await;
        primary
            .mock("GET", "/v5/market/time")
            .with_status(200)
            .with_body(SERVER_TIME)
            .create_async()
            .await;
        let unused = alternate
            .mock("GET", "/v5/market/time")
            .with_status(200)
            .with_body(SERVER_TIME)
            .expect(0)
            .create_async()
            .await;

        let client = failover_client(&primary, &alternate);
        assert!(client.probe().await.is_ok());
        assert_eq!(client.base_url(), primary.url());
        unused.assert_async().await;
    }
}
