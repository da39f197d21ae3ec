//! Execution bridge trait definition.

use crate::error::ExecutionError;
use crate::types::{CloseReason, CloseTrade, Position};
use async_trait::async_trait;

/// Trait for venues that can close a position.
///
/// The monitor guarantees at most one in-flight call per position; implementations
/// do not need to be idempotent.
#[async_trait]
pub trait ExecutionBridge: Send + Sync {
    /// Close the entire position at market.
    ///
    /// # Arguments
    /// * `position` - The position to close (status is CLOSING during the call)
    /// * `reason` - The trigger that caused the close
    ///
    /// # Returns
    /// The confirmed close, or the error reported by the venue
    async fn close_position(
        &self,
        position: &Position,
        reason: CloseReason,
    ) -> Result<CloseTrade, ExecutionError>;

    /// Get the bridge name.
    fn name(&self) -> &str;
}
