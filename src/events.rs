//! Progress event sink.
//!
//! The divider reports decomposition progress as structured key-value blocks.
//! Delivery is fire-and-forget: the divider never waits on, or reacts to,
//! the sink.

/// Receiver for structured progress blocks.
pub trait EventSink: Send + Sync {
    /// Deliver one block. Must not panic; errors stay inside the sink.
    fn send_block(&self, block: serde_json::Value);
}

/// Sink that drops every block.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn send_block(&self, _block: serde_json::Value) {}
}

/// Sink that forwards blocks to `tracing` for hosts without a real
/// telemetry channel.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn send_block(&self, block: serde_json::Value) {
        tracing::info!(target: "task_divider::events", %block, "progress block");
    }
}
