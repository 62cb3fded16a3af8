use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

// Volume bookkeeping is f64; two values within this are considered equal.
pub const VOLUME_EPSILON: f64 = 1e-6;

pub fn ceil_div(a: i64, b: i64) -> i64 {
    debug_assert!(b > 0);
    (a + b - 1) / b
}

/// Cooperative cancellation flag, checked between top-level iterations of
/// long passes (snapshot generation, site scoring). A cancelled pass
/// returns no partial result.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> CancelToken {
        CancelToken::default()
    }
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}
