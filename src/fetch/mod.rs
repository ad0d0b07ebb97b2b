//! Bounded-retry JSON fetching.

use anyhow::{anyhow, Result};
use serde_json::Value;

use crate::retry::{retry_async, RetryPolicy};
use crate::transport::Transport;

pub mod sources;

pub use sources::{fetch_altcoin_season, fetch_fear_greed, fetch_market_data, MarketData};

/// Outcome of a fetch: a value, or the reason there is none.
#[derive(Debug, Clone, PartialEq)]
pub enum Reading<T> {
    Present(T),
    Absent { reason: String },
}

impl<T> Reading<T> {
    pub fn absent(reason: impl Into<String>) -> Self {
        Reading::Absent {
            reason: reason.into(),
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, Reading::Present(_))
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Reading::Present(v) => Some(v),
            Reading::Absent { .. } => None,
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Reading::Present(_) => None,
            Reading::Absent { reason } => Some(reason),
        }
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Reading::Present(v) => Some(v),
            Reading::Absent { .. } => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Reading<U> {
        match self {
            Reading::Present(v) => Reading::Present(f(v)),
            Reading::Absent { reason } => Reading::Absent { reason },
        }
    }

    pub fn and_then<U>(self, f: impl FnOnce(T) -> Reading<U>) -> Reading<U> {
        match self {
            Reading::Present(v) => f(v),
            Reading::Absent { reason } => Reading::Absent { reason },
        }
    }
}

impl<T> From<Result<T>> for Reading<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(v) => Reading::Present(v),
            Err(e) => Reading::absent(format!("{:#}", e)),
        }
    }
}

/// Walk nested object keys in order.
pub fn extract_path(mut value: Value, key_path: &[&str]) -> Result<Value> {
    for key in key_path {
        value = match value {
            Value::Object(mut map) => map
                .remove(*key)
                .ok_or_else(|| anyhow!("missing key '{}'", key))?,
            other => return Err(anyhow!("expected object at '{}', got {}", key, type_name(&other))),
        };
    }
    Ok(value)
}

pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// GET `url` under `policy`, descending `key_path` on success.
///
/// A missing key counts as a failed attempt, exactly like a network error.
pub async fn fetch_with_retry(
    transport: &(dyn Transport + Send + Sync),
    policy: &RetryPolicy,
    operation: &str,
    url: &str,
    key_path: &[&str],
) -> Reading<Value> {
    retry_async(policy, operation, || async move {
        let body = transport.get_json(url).await?;
        extract_path(body, key_path)
    })
    .await
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::ScriptedTransport;
    use serde_json::json;
    use std::time::{Duration, Instant};

    const URL: &str = "http://source.test/global";

    #[test]
    fn test_extract_path_nested() {
        let v = json!({"data": {"inner": 7}});
        assert_eq!(extract_path(v.clone(), &["data", "inner"]).unwrap(), json!(7));
        assert_eq!(extract_path(v.clone(), &[]).unwrap(), v);
    }

    #[test]
    fn test_extract_path_missing_key() {
        let err = extract_path(json!({"data": {}}), &["data", "inner"]).unwrap_err();
        assert!(err.to_string().contains("inner"));
        assert!(extract_path(json!([1, 2]), &["data"]).is_err());
    }

    #[test]
    fn test_reading_combinators() {
        let r: Reading<i64> = Reading::Present(4);
        assert_eq!(r.clone().map(|v| v * 2).into_option(), Some(8));
        assert_eq!(r.value(), Some(&4));

        let a: Reading<i64> = Reading::absent("gone");
        assert_eq!(a.reason(), Some("gone"));
        assert!(!a.clone().and_then(|v| Reading::Present(v + 1)).is_present());
    }

    #[tokio::test]
    async fn test_always_failing_source_attempts_exactly_max_then_absent() {
        let t = ScriptedTransport::new();
        let policy = RetryPolicy::fixed(3, Duration::from_millis(15));
        let started = Instant::now();

        let reading = fetch_with_retry(&t, &policy, "market", URL, &["data"]).await;

        assert!(!reading.is_present());
        assert_eq!(t.get_count(URL), 3);
        assert!(started.elapsed() >= Duration::from_millis(30));
    }

    #[tokio::test]
    async fn test_missing_key_is_retried() {
        let t = ScriptedTransport::new();
        t.respond(URL, json!({"status": "busy"}))
            .respond(URL, json!({"data": {"ok": true}}));
        let policy = RetryPolicy::fixed(3, Duration::from_millis(1));

        let reading = fetch_with_retry(&t, &policy, "market", URL, &["data"]).await;

        assert_eq!(reading, Reading::Present(json!({"ok": true})));
        assert_eq!(t.get_count(URL), 2);
    }

    #[tokio::test]
    async fn test_absent_reason_carries_last_error() {
        let t = ScriptedTransport::new();
        t.fail(URL, "timeout").fail(URL, "503 Service Unavailable");
        let policy = RetryPolicy::fixed(2, Duration::from_millis(1));

        let reading = fetch_with_retry(&t, &policy, "market", URL, &[]).await;

        assert_eq!(reading.reason(), Some("503 Service Unavailable"));
    }
}
