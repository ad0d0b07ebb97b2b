//! The three market-data sources and how their payloads are read.

use serde_json::{Map, Value};

use super::{fetch_with_retry, type_name, Reading};
use crate::logging::{log, obj, v_str, Domain, Level};
use crate::retry::RetryPolicy;
use crate::transport::Transport;

/// Values read from the global market endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketData {
    pub total_market_cap: Reading<f64>,
    pub btc_dominance: Reading<f64>,
    pub eth_dominance: Reading<f64>,
    pub stablecoin_ratio: Reading<f64>,
}

impl MarketData {
    fn all_absent(reason: &str) -> Self {
        Self {
            total_market_cap: Reading::absent(reason),
            btc_dominance: Reading::absent(reason),
            eth_dominance: Reading::absent(reason),
            stablecoin_ratio: Reading::absent(reason),
        }
    }
}

fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn warn_parse(source: &str, msg: &str) {
    log(
        Level::Warn,
        Domain::Fetch,
        "parse_failed",
        obj(&[("source", v_str(source)), ("msg", v_str(msg))]),
    );
}

/// `data[0].value` as an integer: a JSON number (floats truncate toward
/// zero) or a digit string.
pub fn parse_fear_greed(body: &Value) -> Reading<i64> {
    let Some(raw) = body.pointer("/data/0/value") else {
        return Reading::absent("missing data[0].value");
    };
    match raw {
        Value::Number(n) => as_integer(raw)
            .map(Reading::Present)
            .unwrap_or_else(|| Reading::absent(format!("out-of-range value {}", n))),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map(Reading::Present)
            .unwrap_or_else(|_| Reading::absent(format!("unparseable value '{}'", s))),
        other => Reading::absent(format!("unexpected {} for value", type_name(other))),
    }
}

/// An object carrying `seasonIndex`, or a bare number.
pub fn parse_altcoin_season(body: &Value) -> Reading<i64> {
    let reading = match body {
        Value::Object(map) if map.contains_key("seasonIndex") => map
            .get("seasonIndex")
            .and_then(as_integer)
            .map(Reading::Present)
            .unwrap_or_else(|| Reading::absent("seasonIndex is not numeric")),
        Value::Number(_) => as_integer(body)
            .map(Reading::Present)
            .unwrap_or_else(|| Reading::absent("bare value is not numeric")),
        other => Reading::absent(format!("unexpected {} payload", type_name(other))),
    };
    if let Reading::Absent { reason } = &reading {
        warn_parse("alt_season", reason);
    }
    reading
}

fn object_field<'a>(data: &'a Value, key: &str) -> Option<&'a Map<String, Value>> {
    data.get(key).and_then(Value::as_object)
}

fn number_field(map: &Map<String, Value>, key: &str) -> Reading<f64> {
    map.get(key)
        .and_then(Value::as_f64)
        .map(Reading::Present)
        .unwrap_or_else(|| Reading::absent(format!("missing {}", key)))
}

/// Reads the `data` object of the global market endpoint.
///
/// The stablecoin ratio is the usdt plus usdc dominance, each defaulting to
/// zero, so it is present whenever the percentage table itself is.
pub fn parse_market_data(data: &Value) -> MarketData {
    let (Some(caps), Some(pct)) = (
        object_field(data, "total_market_cap"),
        object_field(data, "market_cap_percentage"),
    ) else {
        let reason = "total_market_cap or market_cap_percentage missing";
        warn_parse("market", reason);
        return MarketData::all_absent(reason);
    };

    let stable = |key: &str| pct.get(key).and_then(Value::as_f64).unwrap_or(0.0);

    MarketData {
        total_market_cap: number_field(caps, "usd"),
        btc_dominance: number_field(pct, "btc"),
        eth_dominance: number_field(pct, "eth"),
        stablecoin_ratio: Reading::Present(stable("usdt") + stable("usdc")),
    }
}

/// Fetch the Fear & Greed index
pub async fn fetch_fear_greed(
    transport: &(dyn Transport + Send + Sync),
    policy: &RetryPolicy,
    url: &str,
) -> Reading<i64> {
    fetch_with_retry(transport, policy, "fear_greed", url, &[])
        .await
        .and_then(|body| parse_fear_greed(&body))
}

/// Fetch the Altcoin Season index
pub async fn fetch_altcoin_season(
    transport: &(dyn Transport + Send + Sync),
    policy: &RetryPolicy,
    url: &str,
) -> Reading<i64> {
    fetch_with_retry(transport, policy, "alt_season", url, &[])
        .await
        .and_then(|body| parse_altcoin_season(&body))
}

/// Fetch market cap, dominance and stablecoin ratio
pub async fn fetch_market_data(
    transport: &(dyn Transport + Send + Sync),
    policy: &RetryPolicy,
    url: &str,
) -> MarketData {
    match fetch_with_retry(transport, policy, "market", url, &["data"]).await {
        Reading::Present(data) => parse_market_data(&data),
        Reading::Absent { reason } => MarketData::all_absent(&reason),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::ScriptedTransport;
    use serde_json::json;
    use std::time::Duration;

    #[test]
    fn test_fear_greed_string_value() {
        let body = json!({"name": "Fear and Greed Index", "data": [{"value": "72", "value_classification": "Greed"}]});
        assert_eq!(parse_fear_greed(&body), Reading::Present(72));
    }

    #[test]
    fn test_fear_greed_numeric_value() {
        assert_eq!(parse_fear_greed(&json!({"data": [{"value": 15}]})), Reading::Present(15));
    }

    #[test]
    fn test_fear_greed_float_value() {
        assert_eq!(parse_fear_greed(&json!({"data": [{"value": 72.0}]})), Reading::Present(72));
        assert_eq!(parse_fear_greed(&json!({"data": [{"value": 64.9}]})), Reading::Present(64));
    }

    #[test]
    fn test_fear_greed_bad_shapes() {
        assert!(!parse_fear_greed(&json!({"data": []})).is_present());
        assert!(!parse_fear_greed(&json!({"data": [{"value": "high"}]})).is_present());
        assert!(!parse_fear_greed(&json!({"data": [{"value": null}]})).is_present());
    }

    #[test]
    fn test_alt_season_object_and_bare() {
        assert_eq!(parse_altcoin_season(&json!({"seasonIndex": 61})), Reading::Present(61));
        assert_eq!(parse_altcoin_season(&json!({"seasonIndex": "44"})), Reading::Present(44));
        assert_eq!(parse_altcoin_season(&json!(37.9)), Reading::Present(37));
    }

    #[test]
    fn test_alt_season_other_shapes_absent() {
        assert!(!parse_altcoin_season(&json!({"index": 50})).is_present());
        assert!(!parse_altcoin_season(&json!([50])).is_present());
        assert!(!parse_altcoin_season(&json!("50")).is_present());
    }

    #[test]
    fn test_market_data_full() {
        let data = json!({
            "total_market_cap": {"usd": 2.45e12, "eur": 2.2e12},
            "market_cap_percentage": {"btc": 57.3, "eth": 12.1, "usdt": 4.5, "usdc": 1.5}
        });
        let m = parse_market_data(&data);
        assert_eq!(m.total_market_cap, Reading::Present(2.45e12));
        assert_eq!(m.btc_dominance, Reading::Present(57.3));
        assert_eq!(m.eth_dominance, Reading::Present(12.1));
        assert_eq!(m.stablecoin_ratio, Reading::Present(6.0));
    }

    #[test]
    fn test_market_data_stablecoins_default_to_zero() {
        let data = json!({
            "total_market_cap": {},
            "market_cap_percentage": {"btc": 50.0, "usdt": 3.0}
        });
        let m = parse_market_data(&data);
        assert!(!m.total_market_cap.is_present());
        assert!(!m.eth_dominance.is_present());
        assert_eq!(m.stablecoin_ratio, Reading::Present(3.0));
    }

    #[test]
    fn test_market_data_malformed_all_absent() {
        let m = parse_market_data(&json!({"total_market_cap": 5}));
        assert!(!m.total_market_cap.is_present());
        assert!(!m.btc_dominance.is_present());
        assert!(!m.eth_dominance.is_present());
        assert!(!m.stablecoin_ratio.is_present());
    }

    #[tokio::test]
    async fn test_fetch_market_data_descends_into_data() {
        let url = "http://coingecko.test/global";
        let t = ScriptedTransport::new();
        t.respond(
            url,
            json!({"data": {
                "total_market_cap": {"usd": 1.0e12},
                "market_cap_percentage": {"btc": 60.0, "eth": 10.0, "usdt": 5.0, "usdc": 2.0}
            }}),
        );
        let policy = RetryPolicy::fixed(1, Duration::ZERO);

        let m = fetch_market_data(&t, &policy, url).await;
        assert_eq!(m.stablecoin_ratio, Reading::Present(7.0));
        assert_eq!(m.total_market_cap, Reading::Present(1.0e12));
    }

    #[tokio::test]
    async fn test_parse_failure_is_not_retried() {
        let url = "http://fng.test/";
        let t = ScriptedTransport::new();
        t.respond(url, json!({"data": [{"value": "n/a"}]}));
        let policy = RetryPolicy::fixed(3, Duration::from_millis(1));

        let r = fetch_fear_greed(&t, &policy, url).await;
        assert!(!r.is_present());
        assert_eq!(t.get_count(url), 1);
    }
}
