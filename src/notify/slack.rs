use crate::arb::types::ArbitrageOpportunity;
use crate::utils::decimal::trimmed;
use eyre::Result;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

/// Channel for opportunity alerts
const ALERT_CHANNEL: &str = "#glint";
/// Channel for errors
const ERROR_CHANNEL: &str = "#glint-errors";

/// Slack notifier
#[derive(Debug, Clone)]
pub struct SlackNotifier {
    /// The Slack OAuth token
    token: String,
    /// The HTTP client
    client: Client,
}

impl SlackNotifier {
    /// Create a new Slack notifier
    ///
    /// # Errors
    /// * If `SLACK_OAUTH_TOKEN` is not set
    /// * If the HTTP client cannot be built
    pub fn new() -> Result<Self> {
        let token = std::env::var("SLACK_OAUTH_TOKEN")
            .map_err(|_| eyre::eyre!("SLACK_OAUTH_TOKEN not set"))?;

        // Create a client with a timeout
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;

        Ok(Self { token, client })
    }

    /// Notifier if `SLACK_OAUTH_TOKEN` is set, otherwise `None`
    #[must_use]
    pub fn from_env() -> Option<Self> {
        match Self::new() {
            Ok(notifier) => Some(notifier),
            Err(e) => {
                log::info!("notify::slack: alerts disabled: {e}");
                None
            }
        }
    }

    /// Send a message to a specific channel
    ///
    /// # Errors
    /// * If the request fails or Slack answers with `ok: false`
    pub async fn send_to(&self, msg: &str, channel: &str) -> Result<()> {
        let payload = json!({
            "channel": channel,
            "text": msg,
            "username": "Glint",
            "icon_emoji": ":zap:"
        });

        let response = self
            .client
            .post("https://slack.com/api/chat.postMessage")
            .bearer_auth(&self.token)
            .json(&payload)
            .send()
            .await?
            .json::<serde_json::Value>()
            .await?;

        // Check if Slack API returned success
        if !response["ok"].as_bool().unwrap_or(false) {
            return Err(eyre::eyre!(
                "Slack API error: {}",
                response["error"].as_str().unwrap_or("unknown error")
            ));
        }

        Ok(())
    }

    /// Send a message to the default channel
    ///
    /// # Errors
    /// * If the request fails
    pub async fn send(&self, msg: &str) -> Result<()> {
        self.send_to(msg, ALERT_CHANNEL).await
    }

    /// Send an error message to the error channel
    ///
    /// # Errors
    /// * If the request fails
    pub async fn send_error(&self, error: &str) -> Result<()> {
        self.send_to(&format!(":warning: Error: {error}"), ERROR_CHANNEL)
            .await
    }

    /// Post an opportunity alert
    ///
    /// # Errors
    /// * If the request fails
    pub async fn send_opportunity(&self, opportunity: &ArbitrageOpportunity) -> Result<()> {
        self.send(&format_opportunity(opportunity)).await
    }
}

/// Slack mrkdwn text for an opportunity
#[must_use]
pub fn format_opportunity(opp: &ArbitrageOpportunity) -> String {
    format!(
        ":moneybag: *{}* buy on *{}* at {}, sell on *{}* at {} ({}%)\nnet profit {} on {} (gross {}, slippage {}, gas {})",
        opp.pair,
        opp.buy_exchange,
        trimmed(&opp.buy_price),
        opp.sell_exchange,
        trimmed(&opp.sell_price),
        trimmed(&opp.price_difference_percentage.with_scale(4)),
        trimmed(&opp.net_profit),
        trimmed(&opp.trade_amount),
        trimmed(&opp.estimated_profit.with_scale(4)),
        trimmed(&opp.slippage_cost.with_scale(4)),
        trimmed(&opp.gas_cost),
    )
}
