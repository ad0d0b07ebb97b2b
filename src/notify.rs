use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

use crate::transport::Transport;

/// External message sink. Delivery is best-effort; callers log failures.
#[async_trait]
pub trait Notifier {
    fn name(&self) -> &'static str;
    async fn send(&self, text: &str) -> Result<()>;
}

/// Telegram Bot API `sendMessage` with HTML parse mode.
pub struct TelegramNotifier {
    transport: Arc<dyn Transport + Send + Sync>,
    api_base: String,
    bot_token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(
        transport: Arc<dyn Transport + Send + Sync>,
        api_base: impl Into<String>,
        bot_token: impl Into<String>,
        chat_id: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            api_base: api_base.into(),
            bot_token: bot_token.into(),
            chat_id: chat_id.into(),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/bot{}/sendMessage",
            self.api_base.trim_end_matches('/'),
            self.bot_token
        )
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    fn name(&self) -> &'static str {
        "telegram"
    }

    async fn send(&self, text: &str) -> Result<()> {
        let payload = json!({
            "chat_id": self.chat_id,
            "text": text,
            "parse_mode": "HTML",
            "disable_web_page_preview": true,
        });
        self.transport.post_json(&self.endpoint(), &payload).await
    }
}
