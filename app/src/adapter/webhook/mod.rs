use anyhow::Context as _;
use infrastructure::HttpClientConfig;
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;

use crate::notification::{NotificationMessage, Notifier};

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookSettings {
    pub url: String,
    #[serde(default)]
    pub http: HttpClientConfig,
}

impl WebhookSettings {
    pub fn new_notifier(&self) -> anyhow::Result<WebhookNotifier> {
        Ok(WebhookNotifier {
            client: self.http.new_tracing_client()?,
            url: self.url.clone(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: ClientWithMiddleware,
    url: String,
}

impl Notifier for WebhookNotifier {
    #[tracing::instrument(skip(self))]
    async fn notify(&self, message: &NotificationMessage) -> anyhow::Result<()> {
        self.client
            .post(&self.url)
            .json(message)
            .send()
            .await
            .with_context(|| format!("Error posting notification to {}", self.url))?
            .error_for_status()
            .context("Notification rejected by webhook")?;

        Ok(())
    }
}
