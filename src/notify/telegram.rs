// src/notify/telegram.rs

//! Telegram Bot API notifier.
//!
//! Sends each notification as one `sendMessage` call. The bot token is
//! resolved from the environment at construction time and never read
//! from the config file.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::{AppError, Result};
use crate::models::NotifyConfig;
use crate::notify::Notifier;

const SEND_TIMEOUT_SECS: u64 = 30;

/// Notifier backed by the Telegram Bot API.
pub struct TelegramNotifier {
    client: Client,
    token: String,
    chat_id: String,
    api_base: String,
}

impl TelegramNotifier {
    /// Build a notifier from config, resolving the bot token from the
    /// configured environment variable.
    pub fn from_config(config: &NotifyConfig) -> Result<Self> {
        let token = std::env::var(&config.token_env).map_err(|_| {
            AppError::config(format!(
                "environment variable {} is not set",
                config.token_env
            ))
        })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(SEND_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            token,
            chat_id: config.chat_id.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, subject: &str, body: &str) -> Result<()> {
        let url = format!("{}/bot{}/sendMessage", self.api_base, self.token);
        let text = if body.is_empty() {
            subject.to_string()
        } else {
            format!("{subject}\n\n{body}")
        };
        let params = [("chat_id", self.chat_id.as_str()), ("text", text.as_str())];

        let response = self.client.post(&url).form(&params).send().await?;
        if !response.status().is_success() {
            return Err(AppError::notify(format!(
                "telegram sendMessage returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}
