//! Filter matching.
//!
//! A filter matches an event when every constraint it carries holds by
//! exact equality. Absent constraints are wildcards, so the empty filter
//! matches everything. A filter key that names a field the event lacks
//! fails the match.

use stbl_core::{ChainEvent, EventFilter};

/// Does `event` satisfy every constraint in `filter`?
pub fn matches(filter: &EventFilter, event: &ChainEvent) -> bool {
    if let Some(kind) = &filter.kind {
        if *kind != event.kind {
            return false;
        }
    }

    if let Some(contract) = &filter.contract {
        if event.contract.as_ref() != Some(contract) {
            return false;
        }
    }

    if let Some(name) = &filter.event {
        if event.event.as_ref() != Some(name) {
            return false;
        }
    }

    // Remaining keys constrain the event payload. Null means "no
    // constraint" so a caller can pass an explicit wildcard.
    for (key, expected) in &filter.data {
        if expected.is_null() {
            continue;
        }
        if event.data.get(key) != Some(expected) {
            return false;
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn transfer_event() -> ChainEvent {
        ChainEvent::new("contract_event")
            .with_contract("0xABC")
            .with_event("Transfer")
            .with_data("from", json!("0x1"))
            .with_data("amount", json!(100))
    }

    #[test]
    fn empty_filter_matches_everything() {
        assert!(matches(&EventFilter::new(), &transfer_event()));
        assert!(matches(&EventFilter::new(), &ChainEvent::new("block")));
    }

    #[test]
    fn kind_constraint() {
        let filter = EventFilter::new().with_kind("contract_event");
        assert!(matches(&filter, &transfer_event()));
        assert!(!matches(&filter, &ChainEvent::new("block")));
    }

    #[test]
    fn all_constraints_must_hold() {
        let filter = EventFilter::new()
            .with_contract("0xABC")
            .with_event("Transfer");
        assert!(matches(&filter, &transfer_event()));

        let wrong_event = EventFilter::new()
            .with_contract("0xABC")
            .with_event("Approval");
        assert!(!matches(&wrong_event, &transfer_event()));
    }

    #[test]
    fn payload_keys_use_exact_equality() {
        let filter = EventFilter::new().with_data("amount", json!(100));
        assert!(matches(&filter, &transfer_event()));

        // Same number, different JSON type: no match
        let string_amount = EventFilter::new().with_data("amount", json!("100"));
        assert!(!matches(&string_amount, &transfer_event()));
    }

    #[test]
    fn missing_field_fails_the_match() {
        let filter = EventFilter::new().with_contract("0xABC");
        assert!(!matches(&filter, &ChainEvent::new("contract_event")));

        let payload = EventFilter::new().with_data("missing", json!(1));
        assert!(!matches(&payload, &transfer_event()));
    }

    #[test]
    fn null_payload_constraint_is_a_wildcard() {
        let filter = EventFilter::new().with_data("amount", json!(null));
        assert!(matches(&filter, &transfer_event()));
        assert!(matches(&filter, &ChainEvent::new("block")));
    }
}
