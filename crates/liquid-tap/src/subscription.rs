//! Subscription registry
//!
//! The registry is the single source of truth for what the client is
//! subscribed to: every transport-level subscription has an entry here,
//! and it is the list replayed after a reconnect. Entries survive
//! disconnects and are removed only by an explicit unsubscribe or client
//! shutdown.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use liquid_types::LiquidResult;

use crate::channel::{ChannelKind, ChannelName};

/// Type-erased decode-and-dispatch function for one channel
///
/// Takes the raw event payload, decodes it, and invokes the caller's typed
/// callback. Returns a decode error to be reported to the error sink.
pub type Dispatcher = Arc<dyn Fn(&str) -> LiquidResult<()> + Send + Sync>;

/// Handle returned from a subscribe call, usable for unsubscription
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionHandle {
    channel: String,
}

impl SubscriptionHandle {
    pub(crate) fn new(channel: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
        }
    }

    /// The rendered channel name this handle refers to
    pub fn channel(&self) -> &str {
        &self.channel
    }
}

/// One registered channel subscription
///
/// Identity is the channel name; inserting a subscription for an existing
/// channel replaces its decoder and callback.
pub struct ChannelSubscription {
    channel: String,
    kind: ChannelKind,
    event: &'static str,
    /// Whether the subscription has been issued to the transport for the
    /// current connection. Reset on disconnect so replay can re-issue it.
    active: AtomicBool,
    dispatcher: Dispatcher,
}

impl ChannelSubscription {
    /// Create a subscription for a rendered channel name
    pub fn new(name: &ChannelName, dispatcher: Dispatcher) -> Self {
        Self {
            channel: name.as_str().to_string(),
            kind: name.kind(),
            event: name.kind().event_name(),
            active: AtomicBool::new(false),
            dispatcher,
        }
    }

    /// The rendered channel name
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// The event this subscription is bound to
    pub fn event(&self) -> &'static str {
        self.event
    }

    /// Whether this subscription requires authentication
    pub fn is_private(&self) -> bool {
        self.kind.is_private()
    }
}

impl std::fmt::Debug for ChannelSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelSubscription")
            .field("channel", &self.channel)
            .field("kind", &self.kind)
            .field("event", &self.event)
            .field("active", &self.active.load(Ordering::Relaxed))
            .finish()
    }
}

/// Manages the set of active subscriptions
///
/// Mutated from caller threads (subscribe/unsubscribe) and read from the
/// transport delivery thread (dispatch, replay); the shared map provides
/// the mutual-exclusion discipline.
#[derive(Debug, Default, Clone)]
pub struct SubscriptionManager {
    subscriptions: Arc<DashMap<String, ChannelSubscription>>,
}

impl SubscriptionManager {
    /// Create a new subscription manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscription, replacing any existing one for the channel
    ///
    /// A replaced entry keeps its transport-level activation so the new
    /// decoder takes over without a duplicate subscribe.
    pub fn insert(&self, sub: ChannelSubscription) {
        if let Some(existing) = self.subscriptions.get(sub.channel()) {
            sub.active
                .store(existing.active.load(Ordering::Acquire), Ordering::Release);
        }
        self.subscriptions.insert(sub.channel().to_string(), sub);
    }

    /// Remove the subscription for a channel
    ///
    /// Returns true if an entry was removed. Dispatch racing with removal
    /// simply misses the lookup and becomes a no-op.
    pub fn remove(&self, channel: &str) -> bool {
        self.subscriptions.remove(channel).is_some()
    }

    /// Whether a subscription exists for this channel
    pub fn contains(&self, channel: &str) -> bool {
        self.subscriptions.contains_key(channel)
    }

    /// Number of registered subscriptions
    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Remove everything, returning the channel names that were registered
    pub fn clear(&self) -> Vec<String> {
        let names: Vec<String> = self
            .subscriptions
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        self.subscriptions.clear();
        names
    }

    /// Mark every entry as not issued to the transport
    ///
    /// Called on disconnect; the entries themselves are retained for replay.
    pub fn mark_all_inactive(&self) {
        for entry in self.subscriptions.iter() {
            entry.active.store(false, Ordering::Release);
        }
    }

    /// Mark one entry as issued to the transport
    pub fn mark_active(&self, channel: &str) {
        if let Some(entry) = self.subscriptions.get(channel) {
            entry.active.store(true, Ordering::Release);
        }
    }

    /// Whether the entry has been issued to the transport
    pub fn is_active(&self, channel: &str) -> bool {
        self.subscriptions
            .get(channel)
            .map(|entry| entry.active.load(Ordering::Acquire))
            .unwrap_or(false)
    }

    /// Channel names that still need a transport subscribe
    ///
    /// With `private_allowed` false, private entries are held back (auth
    /// still pending).
    pub fn pending_activation(&self, private_allowed: bool) -> Vec<String> {
        self.subscriptions
            .iter()
            .filter(|entry| !entry.active.load(Ordering::Acquire))
            .filter(|entry| private_allowed || !entry.is_private())
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Look up the dispatcher for a channel event
    ///
    /// Returns the dispatcher and the privacy flag, cloned out of the map
    /// so no shard lock is held while the caller's callback runs (the
    /// callback may itself unsubscribe). `None` when the channel is not
    /// registered or the event name does not match the binding.
    pub fn lookup(&self, channel: &str, event: &str) -> Option<(Dispatcher, bool)> {
        let entry = self.subscriptions.get(channel)?;
        if entry.event() != event {
            return None;
        }
        Some((Arc::clone(&entry.dispatcher), entry.is_private()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::ChannelName;
    use liquid_types::Side;
    use std::sync::atomic::AtomicUsize;

    fn noop_dispatcher() -> Dispatcher {
        Arc::new(|_| Ok(()))
    }

    #[test]
    fn test_insert_and_remove() {
        let manager = SubscriptionManager::new();
        let name = ChannelName::all_executions("ethusd");
        manager.insert(ChannelSubscription::new(&name, noop_dispatcher()));

        assert_eq!(manager.len(), 1);
        assert!(manager.contains("executions_cash_ethusd"));

        assert!(manager.remove("executions_cash_ethusd"));
        assert!(manager.is_empty());
        assert!(!manager.remove("executions_cash_ethusd"));
    }

    #[test]
    fn test_reinsert_replaces_dispatcher_keeps_activation() {
        let manager = SubscriptionManager::new();
        let name = ChannelName::order_book_side("ethusd", Side::Buy);

        let first_calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&first_calls);
        manager.insert(ChannelSubscription::new(
            &name,
            Arc::new(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
        ));
        manager.mark_active(name.as_str());

        let second_calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&second_calls);
        manager.insert(ChannelSubscription::new(
            &name,
            Arc::new(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
        ));

        // Still one entry, still active, new dispatcher in effect
        assert_eq!(manager.len(), 1);
        assert!(manager.is_active(name.as_str()));

        let (dispatcher, _) = manager.lookup(name.as_str(), "updated").unwrap();
        dispatcher("[]").unwrap();
        assert_eq!(first_calls.load(Ordering::SeqCst), 0);
        assert_eq!(second_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_lookup_requires_matching_event() {
        let manager = SubscriptionManager::new();
        let name = ChannelName::all_executions("ethusd");
        manager.insert(ChannelSubscription::new(&name, noop_dispatcher()));

        assert!(manager.lookup("executions_cash_ethusd", "created").is_some());
        assert!(manager.lookup("executions_cash_ethusd", "updated").is_none());
        assert!(manager.lookup("executions_cash_btcusd", "created").is_none());
    }

    #[test]
    fn test_pending_activation_gates_private() {
        let manager = SubscriptionManager::new();
        manager.insert(ChannelSubscription::new(
            &ChannelName::all_executions("ethusd"),
            noop_dispatcher(),
        ));
        manager.insert(ChannelSubscription::new(
            &ChannelName::user_executions("651514", "ethusd"),
            noop_dispatcher(),
        ));

        let public_only = manager.pending_activation(false);
        assert_eq!(public_only, vec!["executions_cash_ethusd".to_string()]);

        let mut all = manager.pending_activation(true);
        all.sort();
        assert_eq!(all.len(), 2);

        manager.mark_active("executions_cash_ethusd");
        let remaining = manager.pending_activation(true);
        assert_eq!(remaining, vec!["executions_651514_cash_ethusd".to_string()]);
    }

    #[test]
    fn test_mark_all_inactive_retains_entries() {
        let manager = SubscriptionManager::new();
        let name = ChannelName::all_executions("ethusd");
        manager.insert(ChannelSubscription::new(&name, noop_dispatcher()));
        manager.mark_active(name.as_str());

        manager.mark_all_inactive();
        assert_eq!(manager.len(), 1);
        assert!(!manager.is_active(name.as_str()));
    }
}
