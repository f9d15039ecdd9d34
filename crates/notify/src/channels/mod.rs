//! Delivery channel implementations.

pub mod webhook;

use async_trait::async_trait;

use crate::error::ChannelError;
use crate::events::RunEvent;

/// Trait for run report delivery channels.
#[async_trait]
pub trait NotifyChannel: Send + Sync {
    /// Get the name of this channel.
    fn name(&self) -> &'static str;

    /// Check if this channel is enabled/configured.
    fn enabled(&self) -> bool;

    /// Deliver a run event through this channel.
    async fn send(&self, event: &RunEvent) -> Result<(), ChannelError>;
}
