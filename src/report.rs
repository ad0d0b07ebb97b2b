//! Text rendering of a run: a coloured console body and an HTML-subset
//! message body.

use chrono::{DateTime, FixedOffset, Offset, Utc};
use colored::{Color, Colorize};

use crate::score::{AlertLevel, AlertThresholds};
use crate::snapshot::MarketSnapshot;

pub const BAR_SEGMENTS: usize = 20;
const FILLED: char = '█';
const EMPTY: char = '░';
const BANNER_WIDTH: usize = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMode {
    Auto,   // Let colored detect the terminal
    Always, // Force colors on
    Never,  // Force colors off
}

impl ColorMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Some(Self::Auto),
            "always" => Some(Self::Always),
            "never" => Some(Self::Never),
            _ => None,
        }
    }

    /// Install this mode as colored's process-wide setting.
    pub fn apply(&self) {
        match self {
            Self::Always => colored::control::set_override(true),
            Self::Never => colored::control::set_override(false),
            Self::Auto => colored::control::unset_override(),
        }
    }
}

fn tier_color(level: AlertLevel) -> Color {
    match level {
        AlertLevel::Extreme => Color::Red,
        AlertLevel::High => Color::BrightRed,
        AlertLevel::Neutral => Color::Yellow,
        AlertLevel::Stable => Color::Green,
    }
}

/// Both renderings of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    /// For the terminal: no tags, tier-coloured when colour is enabled.
    pub console: String,
    /// For the message sink: `<b>` and `<pre>` tags, HTML-escaped text.
    pub markup: String,
}

/// Money in trillions, billions or millions.
pub fn format_usd(value: Option<f64>) -> String {
    match value {
        None => "N/A".to_string(),
        Some(v) if !v.is_finite() => "N/A".to_string(),
        Some(v) if v >= 1_000_000_000_000.0 => format!("${:.2}T", v / 1_000_000_000_000.0),
        Some(v) if v >= 1_000_000_000.0 => format!("${:.2}B", v / 1_000_000_000.0),
        Some(v) => format!("${:.2}M", v / 1_000_000.0),
    }
}

pub fn format_pct(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.2}%", v))
        .unwrap_or_else(|| "N/A".to_string())
}

fn format_index(value: Option<i64>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| "N/A".to_string())
}

/// `YYYY-MM-DD HH:MM (LABEL)` at a fixed UTC offset.
pub fn format_timestamp(now: DateTime<Utc>, utc_offset_hours: i32, label: &str) -> String {
    let offset = FixedOffset::east_opt(utc_offset_hours.saturating_mul(3600)).unwrap_or_else(|| Utc.fix());
    format!("{} ({})", now.with_timezone(&offset).format("%Y-%m-%d %H:%M"), label)
}

/// Segments lit for `score`; the score is clamped to [0, 100] first.
pub fn filled_segments(score: f64) -> usize {
    let clamped = score.clamp(0.0, 100.0);
    if clamped.is_nan() {
        return 0;
    }
    ((clamped / 5.0).floor() as usize).min(BAR_SEGMENTS)
}

pub fn plain_bar(score: f64) -> String {
    let filled = filled_segments(score);
    let mut bar = String::with_capacity(BAR_SEGMENTS * 3);
    for i in 0..BAR_SEGMENTS {
        bar.push(if i < filled { FILLED } else { EMPTY });
    }
    bar
}

pub fn colored_bar(score: f64, level: AlertLevel) -> String {
    let filled = filled_segments(score);
    let glyph_filled = FILLED.to_string();
    let glyph_empty = EMPTY.to_string();
    (0..BAR_SEGMENTS)
        .map(|i| {
            if i < filled {
                glyph_filled.color(tier_color(level)).to_string()
            } else {
                glyph_empty.white().to_string()
            }
        })
        .collect()
}

/// Start-of-run line, printed before the sources are polled.
pub fn render_header(timestamp: &str) -> String {
    format!("🧭 {}", format!("Crypto Market Sentiment ({})", timestamp).cyan())
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

#[derive(Clone, Copy)]
enum Markup {
    Html,
    Plain,
}

impl Markup {
    fn text(self, s: &str) -> String {
        match self {
            Markup::Html => escape_html(s),
            Markup::Plain => s.to_string(),
        }
    }

    fn bold(self, s: &str) -> String {
        match self {
            Markup::Html => format!("<b>{}</b>", escape_html(s)),
            Markup::Plain => s.to_string(),
        }
    }
}

fn body_lines(
    snapshot: &MarketSnapshot,
    score: f64,
    timestamp: &str,
    level: AlertLevel,
    markup: Markup,
) -> Vec<String> {
    let field = |icon: &str, name: &str, value: String| {
        format!("{} {} {}", icon, markup.bold(name), markup.text(&value))
    };
    let [summary, step, outlook] = level.action_lines();

    let mut lines = vec![
        format!("🧭 {}", markup.bold("Crypto Market Sentiment Alert")),
        format!("📅 {}", markup.bold(timestamp)),
        String::new(),
        field("💵", "Total Market Cap:", format_usd(snapshot.total_market_cap)),
        field("🪙", "BTC Dominance:", format_pct(snapshot.btc_dominance)),
        field("🔷", "ETH Dominance:", format_pct(snapshot.eth_dominance)),
        field("💰", "Stablecoin Ratio:", format_pct(snapshot.stablecoin_ratio)),
        field("🌈", "Altcoin Season Index:", format_index(snapshot.alt_season_index)),
        field("😨", "Fear & Greed Index:", format_index(snapshot.fear_greed)),
        field("🧠", "Bubble Risk Score:", format!("{:.2}/100", score)),
    ];
    if let Markup::Html = markup {
        lines.push(format!("<pre>{}</pre>", plain_bar(score)));
    }
    lines.push(String::new());
    lines.push(markup.bold(&level.headline()));
    lines.push(markup.bold(summary));
    lines.push(markup.text(step));
    lines.push(markup.text(outlook));
    lines
}

/// Render the console and message bodies for one run.
///
/// Absent snapshot fields show as `N/A`. The console body ends with the
/// tier-coloured bar; the extreme tier is framed by a warning banner.
/// Whether escapes are emitted at all is decided by `colored::control`.
pub fn render_report(
    snapshot: &MarketSnapshot,
    score: f64,
    timestamp: &str,
    thresholds: &AlertThresholds,
) -> Report {
    let level = AlertLevel::from_score(score, thresholds);
    let markup = body_lines(snapshot, score, timestamp, level, Markup::Html).join("\n");
    let plain = body_lines(snapshot, score, timestamp, level, Markup::Plain).join("\n");

    let rule = "=".repeat(BANNER_WIDTH);
    let mut console = String::new();
    if level == AlertLevel::Extreme {
        console.push_str(&format!(
            "{}\n{}\n{}\n\n",
            rule.red(),
            "🔥🔥🔥  MARKET OVERHEATING ALERT  🔥🔥🔥".red(),
            rule.red()
        ));
    }
    console.push_str(&format!("{}\n", plain.color(tier_color(level))));
    if level == AlertLevel::Extreme {
        console.push_str(&format!("\n{}\n", rule.red()));
    }
    console.push_str(&colored_bar(score, level));

    Report { console, markup }
}
