//! The single-slot rule recorder.
//!
//! A recording session is live only while a type's declaration function runs
//! inside `register`/`register_all`. Fluent constraint calls outside a live
//! session (or on instances whose fields were never slot-bound, i.e. anything
//! that is not the current probe) fall through as no-ops, so declaration
//! functions stay safe to run against throwaway instances.

use std::cell::RefCell;
use std::collections::BTreeMap;

use crate::rule::Rule;
use crate::schema::SlotId;

/// Recorded rules, keyed by slot. `BTreeMap` keeps the key set sorted, which
/// is exactly the ordered-slot list the schema needs.
#[derive(Debug, Default)]
pub(crate) struct Tape {
    rules: BTreeMap<SlotId, Vec<Rule>>,
}

impl Tape {
    fn record(&mut self, slot: SlotId, rule: Rule) {
        self.rules.entry(slot).or_default().push(rule);
    }

    fn amend_last(&mut self, slot: SlotId, message: &str) {
        if let Some(rules) = self.rules.get_mut(&slot) {
            if let Some(last) = rules.last_mut() {
                last.set_message(message);
            }
        }
    }

    /// Walk backward through the slot's rules, setting the message on every
    /// trailing rule that has none, stopping at the first rule that already
    /// carries one. Covers "apply this message to the chain I just added".
    fn amend_group(&mut self, slot: SlotId, message: &str) {
        if let Some(rules) = self.rules.get_mut(&slot) {
            for rule in rules.iter_mut().rev() {
                if rule.message().is_some() {
                    break;
                }
                rule.set_message(message);
            }
        }
    }

    pub(crate) fn into_rules(self) -> BTreeMap<SlotId, Vec<Rule>> {
        self.rules
    }

    #[cfg(test)]
    fn rules_for(&self, slot: SlotId) -> &[Rule] {
        self.rules.get(&slot).map(Vec::as_slice).unwrap_or(&[])
    }
}

thread_local! {
    static ACTIVE: RefCell<Option<Tape>> = const { RefCell::new(None) };
}

/// RAII guard for the recording context. Dropping without `finish` (e.g. a
/// panicking declaration function) clears the slot so the next registration
/// starts clean.
pub(crate) struct RecordingSession {
    _not_send: std::marker::PhantomData<*const ()>,
}

impl RecordingSession {
    pub(crate) fn begin() -> Self {
        ACTIVE.with(|slot| {
            *slot.borrow_mut() = Some(Tape::default());
        });
        Self {
            _not_send: std::marker::PhantomData,
        }
    }

    pub(crate) fn finish(self) -> Tape {
        ACTIVE
            .with(|slot| slot.borrow_mut().take())
            .unwrap_or_default()
    }
}

impl Drop for RecordingSession {
    fn drop(&mut self) {
        ACTIVE.with(|slot| {
            slot.borrow_mut().take();
        });
    }
}

/// Append a rule for the given slot; no-op without a live session or slot.
pub(crate) fn record(slot: Option<SlotId>, rule: Rule) {
    let Some(slot) = slot else { return };
    ACTIVE.with(|tape| {
        if let Some(tape) = tape.borrow_mut().as_mut() {
            tape.record(slot, rule);
        }
    });
}

/// Set the message of the most recently appended rule for the slot.
pub(crate) fn amend_last(slot: Option<SlotId>, message: &str) {
    let Some(slot) = slot else { return };
    ACTIVE.with(|tape| {
        if let Some(tape) = tape.borrow_mut().as_mut() {
            tape.amend_last(slot, message);
        }
    });
}

/// Set the message on the trailing run of message-less rules for the slot.
pub(crate) fn amend_group(slot: Option<SlotId>, message: &str) {
    let Some(slot) = slot else { return };
    ACTIVE.with(|tape| {
        if let Some(tape) = tape.borrow_mut().as_mut() {
            tape.amend_group(slot, message);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::{RuleKind, Value};

    fn rule(kind: RuleKind) -> Rule {
        Rule::new(kind, vec![Value::Int(1)])
    }

    #[test]
    fn record_outside_session_is_noop() {
        record(Some(0), rule(RuleKind::Min));
        let session = RecordingSession::begin();
        let tape = session.finish();
        assert!(tape.into_rules().is_empty());
    }

    #[test]
    fn record_without_slot_is_noop() {
        let session = RecordingSession::begin();
        record(None, rule(RuleKind::Min));
        let tape = session.finish();
        assert!(tape.into_rules().is_empty());
    }

    #[test]
    fn records_in_declaration_order() {
        let session = RecordingSession::begin();
        record(Some(3), rule(RuleKind::Min));
        record(Some(1), rule(RuleKind::Max));
        record(Some(3), rule(RuleKind::Required));
        let tape = session.finish();

        let rules = tape.into_rules();
        let slots: Vec<_> = rules.keys().copied().collect();
        assert_eq!(slots, [1, 3]);
        assert_eq!(rules[&3].len(), 2);
        assert_eq!(rules[&3][0].kind(), RuleKind::Min);
        assert_eq!(rules[&3][1].kind(), RuleKind::Required);
    }

    #[test]
    fn amend_last_touches_only_the_newest_rule() {
        let session = RecordingSession::begin();
        record(Some(0), rule(RuleKind::Min));
        record(Some(0), rule(RuleKind::Max));
        amend_last(Some(0), "too big");

        let tape = session.finish();
        let rules = tape.into_rules();
        assert_eq!(rules[&0][0].message(), None);
        assert_eq!(rules[&0][1].message(), Some("too big"));
    }

    #[test]
    fn amend_group_stops_at_existing_message() {
        let session = RecordingSession::begin();
        record(Some(0), rule(RuleKind::Required));
        amend_last(Some(0), "first message");
        record(Some(0), rule(RuleKind::Min));
        record(Some(0), rule(RuleKind::Max));
        amend_group(Some(0), "numeric bounds");

        let tape = session.finish();
        let rules = tape.into_rules();
        assert_eq!(rules[&0][0].message(), Some("first message"));
        assert_eq!(rules[&0][1].message(), Some("numeric bounds"));
        assert_eq!(rules[&0][2].message(), Some("numeric bounds"));
    }

    #[test]
    fn amend_group_covers_whole_chain_without_prior_messages() {
        let session = RecordingSession::begin();
        record(Some(2), rule(RuleKind::Min));
        record(Some(2), rule(RuleKind::Max));
        amend_group(Some(2), "bounds");

        let tape = session.finish();
        let rules = tape.into_rules();
        assert!(rules[&2].iter().all(|r| r.message() == Some("bounds")));
    }

    #[test]
    fn drop_without_finish_clears_the_slot() {
        {
            let _session = RecordingSession::begin();
            record(Some(0), rule(RuleKind::Min));
        }
        // A new session must not see leftovers.
        let session = RecordingSession::begin();
        let tape = session.finish();
        assert!(tape.into_rules().is_empty());
    }

    #[test]
    fn tape_rules_for_missing_slot_is_empty() {
        let tape = Tape::default();
        assert!(tape.rules_for(9).is_empty());
    }
}
