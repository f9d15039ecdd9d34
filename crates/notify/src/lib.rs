//! Run report delivery for the CLA reconciler.
//!
//! The reconciliation engine produces a run summary plus a full textual
//! trace; this crate delivers them to an operator, fire-and-forget.
//!
//! # Usage
//!
//! ```no_run
//! use notify::{Notifier, RunEvent};
//!
//! let notifier = Notifier::from_env();
//!
//! notifier.notify(RunEvent::RunFailed {
//!     repository: "acme/widgets".to_string(),
//!     error: "signer roster unavailable".to_string(),
//!     timestamp: chrono::Utc::now(),
//! });
//! ```
//!
//! # Configuration
//!
//! - `CLA_NOTIFY_WEBHOOK_URL`: endpoint for the webhook channel
//! - `NOTIFY_DISABLED`: set to "true" to disable all delivery
//!
//! # Architecture
//!
//! Trait-based channel design:
//!
//! - [`NotifyChannel`] defines the interface for delivery channels
//! - [`WebhookChannel`] posts the report as JSON to one endpoint
//! - [`Notifier`] dispatches events to all enabled channels

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod channels;
pub mod error;
pub mod events;

pub use channels::webhook::WebhookChannel;
pub use channels::NotifyChannel;
pub use error::ChannelError;
pub use events::{RunEvent, Severity};

use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Environment variable to disable all delivery.
const ENV_NOTIFY_DISABLED: &str = "NOTIFY_DISABLED";

/// Central run report dispatcher.
pub struct Notifier {
    channels: Vec<Arc<dyn NotifyChannel>>,
    disabled: bool,
}

impl Notifier {
    /// Create a notifier from environment variables, auto-detecting
    /// which channels are configured.
    #[must_use]
    pub fn from_env() -> Self {
        let disabled = std::env::var(ENV_NOTIFY_DISABLED)
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(false);

        if disabled {
            info!("Notifications disabled via NOTIFY_DISABLED");
            return Self {
                channels: vec![],
                disabled: true,
            };
        }

        let mut channels: Vec<Arc<dyn NotifyChannel>> = vec![];

        let webhook = WebhookChannel::from_env();
        if webhook.enabled() {
            info!("Webhook notifications enabled");
            channels.push(Arc::new(webhook));
        }

        if channels.is_empty() {
            warn!("No notification channels configured");
        }

        Self {
            channels,
            disabled: false,
        }
    }

    /// Create a notifier with specific channels.
    #[must_use]
    pub fn with_channels(channels: Vec<Arc<dyn NotifyChannel>>) -> Self {
        Self {
            channels,
            disabled: false,
        }
    }

    /// Create a disabled notifier (for testing or when delivery is off).
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            channels: vec![],
            disabled: true,
        }
    }

    /// Check if any delivery channels are enabled.
    #[must_use]
    pub fn has_channels(&self) -> bool {
        !self.disabled && !self.channels.is_empty()
    }

    /// Deliver an event to all enabled channels (fire-and-forget).
    ///
    /// Spawns a task per channel and returns immediately; errors are
    /// logged, never propagated.
    pub fn notify(&self, event: RunEvent) {
        if self.disabled || self.channels.is_empty() {
            debug!("No delivery channels, skipping event");
            return;
        }

        let event = Arc::new(event);

        for channel in &self.channels {
            let channel = Arc::clone(channel);
            let event = Arc::clone(&event);

            tokio::spawn(async move {
                let channel_name = channel.name();

                match channel.send(&event).await {
                    Ok(()) => {
                        debug!(channel = channel_name, "Run report delivered");
                    }
                    Err(e) => {
                        error!(
                            channel = channel_name,
                            error = %e,
                            "Failed to deliver run report"
                        );
                    }
                }
            });
        }
    }

    /// Deliver an event and wait for every channel to finish.
    ///
    /// Used at binary shutdown, where returning before delivery
    /// completes would drop the report.
    pub async fn notify_and_wait(
        &self,
        event: RunEvent,
    ) -> Vec<(String, Result<(), ChannelError>)> {
        if self.disabled || self.channels.is_empty() {
            return vec![];
        }

        let mut results = vec![];

        for channel in &self.channels {
            let channel_name = channel.name().to_string();
            let result = channel.send(&event).await;
            if let Err(e) = &result {
                error!(channel = %channel_name, error = %e, "Failed to deliver run report");
            }
            results.push((channel_name, result));
        }

        results
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::from_env()
    }
}
