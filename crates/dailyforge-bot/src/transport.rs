//! Seam between the gateway and the chat platform.

use async_trait::async_trait;
use dailyforge_core::Outbound;

use crate::error::TransportError;

/// What an inbound update carries, already stripped of platform detail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundKind {
    Text(String),
    Callback {
        /// Id to acknowledge the button press with.
        id: String,
        data: String,
        /// Message that carried the pressed menu.
        message_id: Option<i64>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inbound {
    pub chat_id: i64,
    pub kind: InboundKind,
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Next batch of inbound updates. Blocks up to the long-poll timeout.
    async fn poll(&self) -> Result<Vec<Inbound>, TransportError>;

    /// Answer a button press, optionally with a short toast.
    async fn acknowledge(&self, callback_id: &str, notice: Option<&str>)
        -> Result<(), TransportError>;

    /// Send one rendered message. `origin` is the menu message an in-place
    /// reply replaces.
    async fn deliver(
        &self,
        chat_id: i64,
        origin: Option<i64>,
        message: &Outbound,
    ) -> Result<(), TransportError>;
}
