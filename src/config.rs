use anyhow::{anyhow, Result};
use std::time::Duration;
use url::Url;

use crate::report::ColorMode;
use crate::retry::{Backoff, RetryPolicy};
use crate::score::{AlertThresholds, ScoreWeights};

#[derive(Clone, Debug)]
pub struct Config {
    pub fear_greed_url: String,
    pub alt_season_url: String,
    pub market_url: String,
    pub telegram_api_base: String,
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,
    pub http_timeout: Duration,
    pub retry: RetryPolicy,
    pub weights: ScoreWeights,
    pub thresholds: AlertThresholds,
    pub utc_offset_hours: i32,
    pub tz_label: String,
    /// Console colouring; `Auto` leaves the choice to `colored`'s TTY and NO_COLOR detection
    pub color: ColorMode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fear_greed_url: "https://api.alternative.me/fng/?limit=1".to_string(),
            alt_season_url: "https://api.blockchaincenter.net/api/altcoin-season-index".to_string(),
            market_url: "https://api.coingecko.com/api/v3/global".to_string(),
            telegram_api_base: "https://api.telegram.org".to_string(),
            telegram_bot_token: None,
            telegram_chat_id: None,
            http_timeout: Duration::from_secs(10),
            retry: RetryPolicy::default(),
            weights: ScoreWeights::default(),
            thresholds: AlertThresholds::default(),
            utc_offset_hours: 8,
            tz_label: "MYT".to_string(),
            color: ColorMode::Auto,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    pub fn from_env() -> Self {
        let d = Self::default();

        let attempts = env_parse("RETRY_ATTEMPTS").unwrap_or(d.retry.max_attempts);
        let delay = Duration::from_millis(env_parse("RETRY_DELAY_MS").unwrap_or(2000));
        let backoff = match std::env::var("RETRY_BACKOFF").as_deref() {
            Ok("exponential") => Backoff::Exponential {
                base: delay,
                max: Duration::from_millis(env_parse("RETRY_MAX_DELAY_MS").unwrap_or(30_000)),
                jitter_factor: env_parse("RETRY_JITTER").unwrap_or(0.3),
            },
            _ => Backoff::Fixed(delay),
        };

        Self {
            fear_greed_url: env_nonempty("FEAR_GREED_URL").unwrap_or(d.fear_greed_url),
            alt_season_url: env_nonempty("ALT_SEASON_URL").unwrap_or(d.alt_season_url),
            market_url: env_nonempty("MARKET_URL").unwrap_or(d.market_url),
            telegram_api_base: env_nonempty("TELEGRAM_API_BASE").unwrap_or(d.telegram_api_base),
            telegram_bot_token: env_nonempty("TELEGRAM_BOT_TOKEN"),
            telegram_chat_id: env_nonempty("TELEGRAM_CHAT_ID"),
            http_timeout: env_parse("HTTP_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(d.http_timeout),
            retry: RetryPolicy {
                max_attempts: attempts,
                backoff,
            },
            weights: ScoreWeights {
                fear_greed: env_parse("WEIGHT_FEAR_GREED").unwrap_or(d.weights.fear_greed),
                alt_season: env_parse("WEIGHT_ALT_SEASON").unwrap_or(d.weights.alt_season),
                stablecoin: env_parse("WEIGHT_STABLECOIN").unwrap_or(d.weights.stablecoin),
            },
            thresholds: AlertThresholds {
                extreme: env_parse("THRESHOLD_EXTREME").unwrap_or(d.thresholds.extreme),
                high: env_parse("THRESHOLD_HIGH").unwrap_or(d.thresholds.high),
                neutral: env_parse("THRESHOLD_NEUTRAL").unwrap_or(d.thresholds.neutral),
            },
            utc_offset_hours: env_parse("UTC_OFFSET_HOURS").unwrap_or(d.utc_offset_hours),
            tz_label: env_nonempty("TZ_LABEL").unwrap_or(d.tz_label),
            color: std::env::var("COLOR")
                .ok()
                .and_then(|v| ColorMode::parse(&v))
                .unwrap_or(d.color),
        }
    }

    /// Both Telegram credentials, when configured.
    pub fn telegram_credentials(&self) -> Option<(&str, &str)> {
        match (&self.telegram_bot_token, &self.telegram_chat_id) {
            (Some(token), Some(chat)) => Some((token.as_str(), chat.as_str())),
            _ => None,
        }
    }

    /// Endpoints must be absolute http(s) URLs and thresholds descending.
    pub fn validate(&self) -> Result<()> {
        for (name, raw) in [
            ("fear_greed_url", &self.fear_greed_url),
            ("alt_season_url", &self.alt_season_url),
            ("market_url", &self.market_url),
            ("telegram_api_base", &self.telegram_api_base),
        ] {
            let parsed = Url::parse(raw).map_err(|e| anyhow!("{}: {}", name, e))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(anyhow!("{}: unsupported scheme '{}'", name, parsed.scheme()));
            }
        }
        let t = &self.thresholds;
        if !(t.extreme >= t.high && t.high >= t.neutral) {
            return Err(anyhow!(
                "thresholds must descend: extreme {} high {} neutral {}",
                t.extreme,
                t.high,
                t.neutral
            ));
        }
        if let Backoff::Exponential { jitter_factor, .. } = self.retry.backoff {
            if !(0.0..=1.0).contains(&jitter_factor) {
                return Err(anyhow!("retry jitter {} must be within [0, 1]", jitter_factor));
            }
        }
        if !(-12..=14).contains(&self.utc_offset_hours) {
            return Err(anyhow!("utc_offset_hours {} out of range", self.utc_offset_hours));
        }
        Ok(())
    }
}
