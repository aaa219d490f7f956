//! Transient feedback messages and the per-controller expiry timer registry.
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Default lifetime of a feedback entry or transient error.
pub const DEFAULT_FEEDBACK_TTL_MS: u64 = 3000;

// ============================================================================
// User-facing messages
// ============================================================================

pub const MSG_REMOVED: &str = "Removed from wishlist";
pub const MSG_ADDED_TO_CART: &str = "Added to cart";
pub const MSG_CLEARED: &str = "Wishlist cleared";

pub const MSG_LOGIN_REQUIRED: &str = "Please log in to continue";
pub const MSG_INVALID_PRODUCT: &str = "Invalid product";
pub const MSG_PRODUCT_UNAVAILABLE: &str = "This product is no longer available";
pub const MSG_LOAD_FAILED: &str = "Failed to load wishlist";
pub const MSG_REMOVE_FAILED: &str = "Failed to remove item from wishlist";
pub const MSG_ADD_TO_CART_FAILED: &str = "Failed to add to cart";
pub const MSG_CLEAR_FAILED: &str = "Failed to clear wishlist";

// ============================================================================
// Feedback entries
// ============================================================================

/// Key a feedback entry is filed under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FeedbackKey {
    /// Outcome of an operation on one product.
    Product(String),
    /// Outcome of clearing the whole wishlist.
    Clear,
}

impl FeedbackKey {
    pub fn product(product_id: impl Into<String>) -> Self {
        FeedbackKey::Product(product_id.into())
    }
}

impl fmt::Display for FeedbackKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedbackKey::Product(id) => f.write_str(id),
            FeedbackKey::Clear => f.write_str("clear"),
        }
    }
}

/// A live feedback message and the instant its expiry timer fires.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FeedbackEntry {
    pub message: Cow<'static, str>,
    pub expires_at: Instant,
}

// ============================================================================
// Timer registry
// ============================================================================

/// What a pending expiry timer clears when it fires.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum TimerSlot {
    Feedback(FeedbackKey),
    /// The single transient error message.
    Error,
}

struct PendingTimer {
    seq: u64,
    handle: JoinHandle<()>,
}

/// Owns every pending expiry task of one controller.
///
/// Holds at most one timer per slot. Each armed timer gets a fresh sequence
/// number; a timer task only takes effect through [`TimerRegistry::complete`]
/// if its sequence is still the current one for the slot, so a timer that
/// already woke up when it was replaced cannot clear the newer entry.
#[derive(Default)]
pub(crate) struct TimerRegistry {
    pending: HashMap<TimerSlot, PendingTimer>,
    next_seq: u64,
}

impl TimerRegistry {
    /// Reserve the sequence number for the next armed timer.
    pub(crate) fn next_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    /// Install `handle` for `slot`, aborting whatever was pending there.
    pub(crate) fn arm(&mut self, slot: TimerSlot, seq: u64, handle: JoinHandle<()>) {
        if let Some(previous) = self.pending.insert(slot, PendingTimer { seq, handle }) {
            previous.handle.abort();
        }
    }

    /// Abort the timer for `slot`. Returns true if one was pending.
    pub(crate) fn cancel(&mut self, slot: &TimerSlot) -> bool {
        match self.pending.remove(slot) {
            Some(timer) => {
                timer.handle.abort();
                true
            }
            None => false,
        }
    }

    /// Called by a fired timer. Returns true if it is still the live timer for `slot`.
    pub(crate) fn complete(&mut self, slot: &TimerSlot, seq: u64) -> bool {
        match self.pending.get(slot) {
            Some(timer) if timer.seq == seq => {
                self.pending.remove(slot);
                true
            }
            _ => false,
        }
    }

    /// Abort every pending timer. Returns how many were cancelled.
    pub(crate) fn cancel_all(&mut self) -> usize {
        let count = self.pending.len();
        for (_, timer) in self.pending.drain() {
            timer.handle.abort();
        }
        count
    }

    pub(crate) fn is_pending(&self, slot: &TimerSlot) -> bool {
        self.pending.contains_key(slot)
    }

    pub(crate) fn len(&self) -> usize {
        self.pending.len()
    }
}

impl Drop for TimerRegistry {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
