use super::feedback::{FeedbackEntry, FeedbackKey, TimerRegistry, TimerSlot};
use super::item::WishlistItem;
use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

/// Read-only view of the controller state for the presentation layer.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WishlistSnapshot {
    pub items: Vec<WishlistItem>,
    pub loading: bool,
    pub error: Option<String>,
    pub feedback: BTreeMap<FeedbackKey, String>,
    pub confirming_clear: bool,
}

impl WishlistSnapshot {
    pub fn feedback_for(&self, key: &FeedbackKey) -> Option<&str> {
        self.feedback.get(key).map(String::as_str)
    }

    pub fn contains(&self, product_id: &str) -> bool {
        self.items.iter().any(|item| item.product_id == product_id)
    }
}

#[derive(Default)]
pub(crate) struct ViewState {
    pub items: Vec<WishlistItem>,
    pub loading: bool,
    pub error: Option<Cow<'static, str>>,
    pub feedback: HashMap<FeedbackKey, FeedbackEntry>,
    pub confirming_clear: bool,
}

/// Removals made while a refresh is in flight.
///
/// The refresh filters its result through these so that a remove finishing
/// first is not undone by an older store listing.
#[derive(Default)]
pub(crate) struct Tombstones {
    ids: HashSet<String>,
    cleared: bool,
}

impl Tombstones {
    pub fn reset(&mut self) {
        self.ids.clear();
        self.cleared = false;
    }

    pub fn bury(&mut self, product_id: &str) {
        self.ids.insert(product_id.to_string());
    }

    pub fn bury_all(&mut self) {
        self.cleared = true;
    }

    pub fn apply(&self, items: Vec<WishlistItem>) -> Vec<WishlistItem> {
        if self.cleared {
            return Vec::new();
        }
        items
            .into_iter()
            .filter(|item| !self.ids.contains(&item.product_id))
            .collect()
    }
}

#[derive(Default)]
pub(crate) struct Inner {
    pub view: ViewState,
    pub timers: TimerRegistry,
    /// Bumped by every refresh; only the latest refresh may publish.
    pub refresh_generation: u64,
    pub tombstones: Tombstones,
    pub disposed: bool,
}

impl Inner {
    pub fn remove_item(&mut self, product_id: &str) -> bool {
        let before = self.view.items.len();
        self.view.items.retain(|item| item.product_id != product_id);
        self.tombstones.bury(product_id);
        self.view.items.len() != before
    }

    /// Set a message that stays until replaced or dismissed.
    pub fn set_error(&mut self, message: impl Into<Cow<'static, str>>) {
        self.timers.cancel(&TimerSlot::Error);
        self.view.error = Some(message.into());
    }

    pub fn clear_error(&mut self) {
        self.timers.cancel(&TimerSlot::Error);
        self.view.error = None;
    }

    pub fn snapshot(&self) -> WishlistSnapshot {
        WishlistSnapshot {
            items: self.view.items.clone(),
            loading: self.view.loading,
            error: self.view.error.as_ref().map(|e| e.to_string()),
            feedback: self
                .view
                .feedback
                .iter()
                .map(|(key, entry)| (key.clone(), entry.message.to_string()))
                .collect(),
            confirming_clear: self.view.confirming_clear,
        }
    }
}

/// State shared between the controller and its expiry tasks.
pub(crate) struct Shared {
    inner: Mutex<Inner>,
    revision: watch::Sender<u64>,
    ttl: Duration,
}

impl Shared {
    pub fn new(ttl: Duration) -> Arc<Self> {
        let (revision, _) = watch::channel(0);
        Arc::new(Self {
            inner: Mutex::new(Inner::default()),
            revision,
            ttl,
        })
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn read<R>(&self, f: impl FnOnce(&Inner) -> R) -> R {
        f(&self.lock())
    }

    /// Mutate state and notify subscribers.
    pub fn update<R>(&self, f: impl FnOnce(&mut Inner) -> R) -> R {
        let result = f(&mut self.lock());
        self.revision.send_modify(|rev| *rev = rev.wrapping_add(1));
        result
    }

    /// Mutate state unless the view has been disposed.
    pub fn update_live<R>(&self, f: impl FnOnce(&mut Inner) -> R) -> Option<R> {
        let mut inner = self.lock();
        if inner.disposed {
            return None;
        }
        let result = f(&mut inner);
        drop(inner);
        self.revision.send_modify(|rev| *rev = rev.wrapping_add(1));
        Some(result)
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    /// Record a success message for `key` and (re)arm its expiry.
    pub fn show_feedback(
        self: &Arc<Self>,
        inner: &mut Inner,
        key: FeedbackKey,
        message: impl Into<Cow<'static, str>>,
    ) {
        let expires_at = Instant::now() + self.ttl;
        inner.view.feedback.insert(
            key.clone(),
            FeedbackEntry {
                message: message.into(),
                expires_at,
            },
        );
        self.schedule_expiry(inner, TimerSlot::Feedback(key), expires_at);
    }

    /// Set an error message that clears itself after the TTL.
    pub fn show_transient_error(
        self: &Arc<Self>,
        inner: &mut Inner,
        message: impl Into<Cow<'static, str>>,
    ) {
        inner.view.error = Some(message.into());
        let deadline = Instant::now() + self.ttl;
        self.schedule_expiry(inner, TimerSlot::Error, deadline);
    }

    fn schedule_expiry(self: &Arc<Self>, inner: &mut Inner, slot: TimerSlot, deadline: Instant) {
        let seq = inner.timers.next_seq();
        let weak = Arc::downgrade(self);
        let task_slot = slot.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            if let Some(shared) = weak.upgrade() {
                shared.expire(&task_slot, seq);
            }
        });
        inner.timers.arm(slot, seq, handle);
    }

    fn expire(&self, slot: &TimerSlot, seq: u64) {
        let mut inner = self.lock();
        if !inner.timers.complete(slot, seq) {
            return;
        }
        match slot {
            TimerSlot::Feedback(key) => {
                inner.view.feedback.remove(key);
                tracing::trace!(key = %key, "Feedback entry expired");
            }
            TimerSlot::Error => {
                inner.view.error = None;
                tracing::trace!("Transient error expired");
            }
        }
        drop(inner);
        self.revision.send_modify(|rev| *rev = rev.wrapping_add(1));
    }

    /// Remove a feedback entry and its timer.
    pub fn dismiss_feedback(&self, key: &FeedbackKey) -> bool {
        self.update(|inner| {
            inner.timers.cancel(&TimerSlot::Feedback(key.clone()));
            inner.view.feedback.remove(key).is_some()
        })
    }

    /// Cancel every timer and drop the view state. Idempotent.
    pub fn dispose(&self) -> usize {
        let mut inner = self.lock();
        if inner.disposed {
            return 0;
        }
        inner.disposed = true;
        let cancelled = inner.timers.cancel_all();
        inner.view = ViewState::default();
        drop(inner);
        self.revision.send_modify(|rev| *rev = rev.wrapping_add(1));
        cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tokio::time::{self, Duration};

    const TTL: Duration = Duration::from_millis(3000);

    async fn settle() {
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
    }

    fn show(shared: &Arc<Shared>, key: FeedbackKey, message: &'static str) {
        shared.update(|inner| shared.show_feedback(inner, key, message));
    }

    #[tokio::test(start_paused = true)]
    async fn test_feedback_expires_after_ttl() {
        let shared = Shared::new(TTL);
        let key = FeedbackKey::product("p1");
        show(&shared, key.clone(), "Removed");

        time::advance(Duration::from_millis(2999)).await;
        settle().await;
        assert!(shared.read(|i| i.view.feedback.contains_key(&key)));

        time::advance(Duration::from_millis(2)).await;
        settle().await;
        assert!(shared.read(|i| i.view.feedback.is_empty()));
        assert_eq!(shared.read(|i| i.timers.len()), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_replacement_restarts_expiry() {
        let shared = Shared::new(TTL);
        let key = FeedbackKey::product("p1");
        show(&shared, key.clone(), "first");

        time::advance(Duration::from_millis(2000)).await;
        let replaced_at = Instant::now();
        show(&shared, key.clone(), "second");
        let expires_at = shared.read(|i| i.view.feedback.get(&key).map(|e| e.expires_at));
        assert_eq!(expires_at, Some(replaced_at + TTL));

        // The first timer's deadline passes without effect
        time::advance(Duration::from_millis(1500)).await;
        settle().await;
        let message = shared.read(|i| i.view.feedback.get(&key).map(|e| e.message.to_string()));
        assert_eq!(message.as_deref(), Some("second"));

        time::advance(Duration::from_millis(1600)).await;
        settle().await;
        assert!(shared.read(|i| i.view.feedback.is_empty()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_persistent_error_cancels_transient_timer() {
        let shared = Shared::new(TTL);
        shared.update(|inner| shared.show_transient_error(inner, "transient"));
        shared.update(|inner| inner.set_error("sticky"));

        time::advance(Duration::from_millis(5000)).await;
        settle().await;
        let error = shared.read(|i| i.view.error.as_ref().map(|e| e.to_string()));
        assert_eq!(error.as_deref(), Some("sticky"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dismiss_cancels_timer() {
        let shared = Shared::new(TTL);
        let key = FeedbackKey::Clear;
        show(&shared, key.clone(), "Wishlist cleared");

        assert!(shared.dismiss_feedback(&key));
        assert_eq!(shared.read(|i| i.timers.len()), 0);
        assert!(!shared.dismiss_feedback(&key));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispose_cancels_everything() {
        let shared = Shared::new(TTL);
        show(&shared, FeedbackKey::product("a"), "x");
        show(&shared, FeedbackKey::Clear, "y");
        shared.update(|inner| shared.show_transient_error(inner, "z"));

        assert_eq!(shared.dispose(), 3);
        assert_eq!(shared.dispose(), 0);
        assert!(shared.update_live(|_| ()).is_none());

        time::advance(Duration::from_millis(5000)).await;
        settle().await;
        assert!(shared.read(|i| i.view.feedback.is_empty() && i.view.error.is_none()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_updates_bump_revision() {
        let shared = Shared::new(TTL);
        let mut rx = shared.subscribe();
        show(&shared, FeedbackKey::product("p1"), "Removed");
        assert!(rx.has_changed().unwrap());
        let _ = rx.borrow_and_update();

        time::advance(TTL).await;
        settle().await;
        assert!(rx.has_changed().unwrap());
    }

    #[test]
    fn test_tombstones_filter_items() {
        let item = |id: &str| WishlistItem {
            product_id: id.to_string(),
            price: None,
            mrp: None,
            image: None,
            name: None,
            description: None,
            category: None,
            added_at: None,
            quantity: None,
        };
        let mut tombstones = Tombstones::default();
        tombstones.bury("p2");
        let kept = tombstones.apply(vec![item("p1"), item("p2")]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].product_id, "p1");

        tombstones.bury_all();
        assert!(tombstones.apply(vec![item("p1")]).is_empty());

        tombstones.reset();
        assert_eq!(tombstones.apply(vec![item("p2")]).len(), 1);
    }

    proptest! {
        #[test]
        fn prop_at_most_one_timer_per_key(keys in proptest::collection::vec(0u8..4, 1..40)) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .start_paused(true)
                .build()
                .unwrap();
            runtime.block_on(async {
                let shared = Shared::new(TTL);
                let mut distinct = HashSet::new();
                for k in &keys {
                    let key = FeedbackKey::product(format!("p{}", k));
                    distinct.insert(key.clone());
                    show(&shared, key, "feedback");
                    time::advance(Duration::from_millis(10)).await;

                    let (timers, entries) =
                        shared.read(|i| (i.timers.len(), i.view.feedback.len()));
                    prop_assert_eq!(timers, distinct.len());
                    prop_assert_eq!(entries, distinct.len());
                }
                Ok::<(), proptest::test_runner::TestCaseError>(())
            })?;
        }
    }
}
