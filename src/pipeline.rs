//! One run: fetch, score, render, notify.

use chrono::{DateTime, Utc};
use serde_json::json;
use std::sync::Arc;

use crate::config::Config;
use crate::fetch::{fetch_altcoin_season, fetch_fear_greed, fetch_market_data};
use crate::logging::{log, log_score, obj, v_str, Domain, Level};
use crate::notify::{Notifier, TelegramNotifier};
use crate::report::{format_timestamp, render_header, render_report, Report};
use crate::score::{compute_bubble_score, AlertLevel};
use crate::snapshot::MarketSnapshot;
use crate::transport::Transport;

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub snapshot: MarketSnapshot,
    pub score: f64,
    pub level: AlertLevel,
    /// Start-of-run line printed before polling.
    pub header: String,
    pub report: Report,
    /// True only when a notifier accepted the message.
    pub delivered: bool,
}

pub struct Pipeline {
    config: Config,
    transport: Arc<dyn Transport + Send + Sync>,
    notifier: Option<Box<dyn Notifier + Send + Sync>>,
}

impl Pipeline {
    pub fn new(
        config: Config,
        transport: Arc<dyn Transport + Send + Sync>,
        notifier: Option<Box<dyn Notifier + Send + Sync>>,
    ) -> Self {
        Self {
            config,
            transport,
            notifier,
        }
    }

    /// Wire a Telegram notifier from the configured credentials, if any.
    pub fn from_config(config: Config, transport: Arc<dyn Transport + Send + Sync>) -> Self {
        let notifier: Option<Box<dyn Notifier + Send + Sync>> =
            config.telegram_credentials().map(|(token, chat)| {
                Box::new(TelegramNotifier::new(
                    transport.clone(),
                    config.telegram_api_base.clone(),
                    token,
                    chat,
                )) as Box<dyn Notifier + Send + Sync>
            });
        Self::new(config, transport, notifier)
    }

    /// Fetch the three sources in sequence.
    pub async fn collect(&self) -> MarketSnapshot {
        let t = self.transport.as_ref();
        let policy = &self.config.retry;

        let fear_greed = fetch_fear_greed(t, policy, &self.config.fear_greed_url).await;
        let alt_season = fetch_altcoin_season(t, policy, &self.config.alt_season_url).await;
        let market = fetch_market_data(t, policy, &self.config.market_url).await;

        MarketSnapshot::from_readings(fear_greed, alt_season, market)
    }

    /// Score and render a snapshot.
    pub fn evaluate(&self, snapshot: &MarketSnapshot, now: DateTime<Utc>) -> (f64, AlertLevel, Report) {
        let score = compute_bubble_score(
            snapshot.fear_greed.map(|v| v as f64),
            snapshot.alt_season_index.map(|v| v as f64),
            snapshot.stablecoin_ratio,
            &self.config.weights,
        );
        let level = AlertLevel::from_score(score, &self.config.thresholds);
        log_score(
            score,
            level.label(),
            &[
                ("fear_greed", snapshot.fear_greed.map(|v| v as f64)),
                ("alt_season_index", snapshot.alt_season_index.map(|v| v as f64)),
                ("stablecoin_ratio", snapshot.stablecoin_ratio),
            ],
        );

        let timestamp = format_timestamp(now, self.config.utc_offset_hours, &self.config.tz_label);
        let report = render_report(snapshot, score, &timestamp, &self.config.thresholds);
        (score, level, report)
    }

    /// Hand the markup body to the notifier. Failures are logged, never raised.
    pub async fn deliver(&self, report: &Report) -> bool {
        let Some(notifier) = &self.notifier else {
            log(
                Level::Info,
                Domain::Notify,
                "skipped",
                obj(&[("msg", v_str("no message sink configured"))]),
            );
            return false;
        };
        match notifier.send(&report.markup).await {
            Ok(()) => {
                log(
                    Level::Info,
                    Domain::Notify,
                    "sent",
                    obj(&[("sink", v_str(notifier.name())), ("chars", json!(report.markup.chars().count()))]),
                );
                true
            }
            Err(e) => {
                log(
                    Level::Error,
                    Domain::Notify,
                    "send_failed",
                    obj(&[("sink", v_str(notifier.name())), ("error", v_str(&format!("{:#}", e)))]),
                );
                false
            }
        }
    }

    /// Run once. Always produces a report, whatever the sources return.
    pub async fn run(&self, now: DateTime<Utc>) -> RunOutcome {
        let timestamp = format_timestamp(now, self.config.utc_offset_hours, &self.config.tz_label);
        let header = render_header(&timestamp);
        println!("\n{}", header);
        log(
            Level::Info,
            Domain::System,
            "run_started",
            obj(&[("msg", v_str(&timestamp)), ("attempts_per_source", json!(self.config.retry.attempts()))]),
        );

        let snapshot = self.collect().await;
        log(
            Level::Info,
            Domain::Fetch,
            "snapshot",
            obj(&[
                ("present", json!(snapshot.present_count())),
                ("snapshot", serde_json::to_value(&snapshot).unwrap_or_default()),
            ]),
        );

        let (score, level, report) = self.evaluate(&snapshot, now);
        println!("{}", report.console);
        let delivered = self.deliver(&report).await;

        RunOutcome {
            snapshot,
            score,
            level,
            header,
            report,
            delivered,
        }
    }
}
