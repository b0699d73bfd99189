use crate::errors::{ReporterError, Result};
use log::debug;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use std::time::Duration;

/// Discord webhook 推送器
pub struct DiscordWebhook {
    client: Client,
    url: String,
}

impl DiscordWebhook {
    pub fn new(url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ReporterError::RequestError(e))?;

        Ok(Self {
            client,
            url: url.to_string(),
        })
    }

    /// 发送一则讯息并附上档案
    pub async fn send_file(&self, filename: &str, bytes: Vec<u8>, message: &str) -> Result<()> {
        debug!("Posting {} to webhook", filename);

        let part = Part::bytes(bytes).file_name(filename.to_string());
        let form = Form::new()
            .text("content", message.to_string())
            .part("file", part);

        let response = self.client.post(&self.url).multipart(form).send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(ReporterError::WebhookError(format!(
                "webhook returned status {}",
                status
            )));
        }

        Ok(())
    }
}
