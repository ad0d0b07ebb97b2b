//! HTTP seam between the pipeline and the outside world.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

#[async_trait]
pub trait Transport {
    /// GET `url` and decode the body as JSON. Non-2xx statuses are errors.
    async fn get_json(&self, url: &str) -> Result<Value>;
    /// POST `body` as JSON to `url`. Non-2xx statuses are errors.
    async fn post_json(&self, url: &str, body: &Value) -> Result<()>;
}

/// reqwest-backed transport with a fixed per-request timeout.
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("bubblewatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| anyhow!("failed to build http client: {}", e))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get_json(&self, url: &str) -> Result<Value> {
        let resp = self.client.get(url).send().await?.error_for_status()?;
        Ok(resp.json::<Value>().await?)
    }

    async fn post_json(&self, url: &str, body: &Value) -> Result<()> {
        self.client
            .post(url)
            .json(body)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

/// In-memory transport that replays queued responses per URL.
///
/// A URL with an empty queue fails, so an unscripted source behaves like an
/// unreachable one. Every GET and POST is recorded.
#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<HashMap<String, VecDeque<std::result::Result<Value, String>>>>,
    post_failure: Mutex<Option<String>>,
    gets: Mutex<Vec<String>>,
    posts: Mutex<Vec<(String, Value)>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful JSON body for `url`.
    pub fn respond(&self, url: &str, body: Value) -> &Self {
        self.push(url, Ok(body));
        self
    }

    /// Queue a failure for `url`.
    pub fn fail(&self, url: &str, error: &str) -> &Self {
        self.push(url, Err(error.to_string()));
        self
    }

    /// Make every POST fail with `error`.
    pub fn fail_posts(&self, error: &str) {
        if let Ok(mut slot) = self.post_failure.lock() {
            *slot = Some(error.to_string());
        }
    }

    pub fn get_count(&self, url: &str) -> usize {
        self.gets
            .lock()
            .map(|g| g.iter().filter(|u| u.as_str() == url).count())
            .unwrap_or(0)
    }

    pub fn posts(&self) -> Vec<(String, Value)> {
        self.posts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    fn push(&self, url: &str, entry: std::result::Result<Value, String>) {
        if let Ok(mut map) = self.responses.lock() {
            map.entry(url.to_string()).or_default().push_back(entry);
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn get_json(&self, url: &str) -> Result<Value> {
        self.gets
            .lock()
            .map_err(|_| anyhow!("scripted transport lock poisoned"))?
            .push(url.to_string());
        let next = self
            .responses
            .lock()
            .map_err(|_| anyhow!("scripted transport lock poisoned"))?
            .get_mut(url)
            .and_then(|q| q.pop_front());
        match next {
            Some(Ok(body)) => Ok(body),
            Some(Err(e)) => Err(anyhow!(e)),
            None => Err(anyhow!("no scripted response for {}", url)),
        }
    }

    async fn post_json(&self, url: &str, body: &Value) -> Result<()> {
        self.posts
            .lock()
            .map_err(|_| anyhow!("scripted transport lock poisoned"))?
            .push((url.to_string(), body.clone()));
        let failure = self
            .post_failure
            .lock()
            .map_err(|_| anyhow!("scripted transport lock poisoned"))?
            .clone();
        match failure {
            Some(e) => Err(anyhow!(e)),
            None => Ok(()),
        }
    }
}
