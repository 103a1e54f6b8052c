use std::sync::atomic::{AtomicU64, Ordering};

use stocklink_transfers::TransferOrderId;

/// Allocator for sequential order numbers.
///
/// A number taken by a submission that then fails is not reused.
#[derive(Debug)]
pub struct OrderNumbers {
    last: AtomicU64,
}

impl OrderNumbers {
    /// Continue after the highest number already in use.
    pub fn starting_after(last: Option<TransferOrderId>) -> Self {
        Self {
            last: AtomicU64::new(last.map_or(0, |id| id.0)),
        }
    }

    pub fn next(&self) -> TransferOrderId {
        TransferOrderId(self.last.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

impl Default for OrderNumbers {
    fn default() -> Self {
        Self::starting_after(None)
    }
}
