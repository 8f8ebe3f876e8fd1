//! The subscription registry.
//!
//! Holds every live subscription and fans inbound events out to the active
//! ones whose filter matches. Listings come back in creation order.

use crate::filter;
use std::collections::HashMap;
use stbl_core::{ChainEvent, EventFilter, Subscription};
use tracing::debug;

#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    subscriptions: HashMap<String, Subscription>,
    // Creation order for stable listings
    order: Vec<String>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new active subscription for `filter` and return it.
    pub fn subscribe(&mut self, filter: EventFilter) -> Subscription {
        let id = subscription_id();
        let subscription = Subscription {
            id: id.clone(),
            filter,
            active: true,
            created_at: chrono::Utc::now(),
            match_count: 0,
        };
        debug!(subscription_id = %id, "Subscription created");
        self.subscriptions.insert(id.clone(), subscription.clone());
        self.order.push(id);
        subscription
    }

    /// Remove a subscription. Returns false when the id is unknown, so a
    /// repeated unsubscribe is a no-op rather than an error.
    pub fn unsubscribe(&mut self, id: &str) -> bool {
        let removed = self.subscriptions.remove(id).is_some();
        if removed {
            self.order.retain(|o| o != id);
            debug!(subscription_id = %id, "Subscription removed");
        }
        removed
    }

    pub fn get(&self, id: &str) -> Option<&Subscription> {
        self.subscriptions.get(id)
    }

    /// Set a subscription's active flag. Returns false for unknown ids.
    pub fn set_active(&mut self, id: &str, active: bool) -> bool {
        match self.subscriptions.get_mut(id) {
            Some(s) => {
                s.active = active;
                true
            }
            None => false,
        }
    }

    /// All subscriptions in creation order.
    pub fn list(&self) -> Vec<Subscription> {
        self.order
            .iter()
            .filter_map(|id| self.subscriptions.get(id))
            .cloned()
            .collect()
    }

    /// Deliver an event: every active subscription whose filter matches has
    /// its match count bumped. Returns the matching ids in creation order.
    pub fn fan_out(&mut self, event: &ChainEvent) -> Vec<String> {
        let mut matched = Vec::new();
        for id in &self.order {
            if let Some(sub) = self.subscriptions.get_mut(id) {
                if sub.active && filter::matches(&sub.filter, event) {
                    sub.match_count += 1;
                    matched.push(id.clone());
                }
            }
        }
        matched
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }
}

/// Subscription ids look like `sub_1700000000000_9f2c41ab7`.
fn subscription_id() -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!(
        "sub_{}_{}",
        chrono::Utc::now().timestamp_millis(),
        &suffix[..9]
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn subscribe_assigns_unique_ids() {
        let mut registry = SubscriptionRegistry::new();
        let a = registry.subscribe(EventFilter::new());
        let b = registry.subscribe(EventFilter::new());
        assert_ne!(a.id, b.id);
        assert!(a.id.starts_with("sub_"));
        assert!(a.active);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn unsubscribe_is_idempotent() {
        let mut registry = SubscriptionRegistry::new();
        let sub = registry.subscribe(EventFilter::new());
        assert!(registry.unsubscribe(&sub.id));
        assert!(!registry.unsubscribe(&sub.id));
        assert!(registry.is_empty());
    }

    #[test]
    fn list_preserves_creation_order() {
        let mut registry = SubscriptionRegistry::new();
        let a = registry.subscribe(EventFilter::new().with_kind("block"));
        let b = registry.subscribe(EventFilter::new().with_kind("contract_event"));
        let c = registry.subscribe(EventFilter::new());
        registry.unsubscribe(&b.id);

        let ids: Vec<_> = registry.list().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![a.id, c.id]);
    }

    #[test]
    fn fan_out_hits_active_matching_subscriptions_only() {
        let mut registry = SubscriptionRegistry::new();
        let blocks = registry.subscribe(EventFilter::new().with_kind("block"));
        let transfers = registry.subscribe(
            EventFilter::new()
                .with_kind("contract_event")
                .with_event("Transfer"),
        );
        let paused = registry.subscribe(EventFilter::new());
        registry.set_active(&paused.id, false);

        let event = ChainEvent::new("block").with_data("n", json!(7));
        let matched = registry.fan_out(&event);

        assert_eq!(matched, vec![blocks.id.clone()]);
        assert_eq!(registry.get(&blocks.id).unwrap().match_count, 1);
        assert_eq!(registry.get(&transfers.id).unwrap().match_count, 0);
        assert_eq!(registry.get(&paused.id).unwrap().match_count, 0);
    }

    #[test]
    fn fan_out_skips_removed_subscriptions() {
        let mut registry = SubscriptionRegistry::new();
        let sub = registry.subscribe(EventFilter::new().with_kind("block"));
        let event = ChainEvent::new("block");
        registry.fan_out(&event);
        assert!(registry.unsubscribe(&sub.id));

        assert!(registry.fan_out(&event).is_empty());
        assert!(registry.get(&sub.id).is_none());
        assert!(registry.list().is_empty());
    }

    #[test]
    fn fan_out_counts_accumulate() {
        let mut registry = SubscriptionRegistry::new();
        let sub = registry.subscribe(EventFilter::new());
        let event = ChainEvent::new("block");
        registry.fan_out(&event);
        registry.fan_out(&event);
        assert_eq!(registry.get(&sub.id).unwrap().match_count, 2);
    }
}
