//! Property-based tests for event application, outbox compaction and share tokens

use chrono::Utc;
use logitrack::client::export::{decode_snapshot, encode_snapshot};
use logitrack::client::offline::{Outbox, PendingMutation};
use logitrack::client::subscription::apply_event;
use logitrack::client::RecordList;
use logitrack::shared::{Carrier, LogisticsRecord, RecordEvent, RecordPatch};
use proptest::prelude::*;

fn carrier() -> impl Strategy<Value = Carrier> {
    prop::sample::select(Carrier::ALL.to_vec())
}

fn tracking_number() -> impl Strategy<Value = String> {
    "[A-Z0-9]{4,20}"
}

#[derive(Debug, Clone)]
enum Edit {
    Favorite(bool),
    Delivered(bool),
}

fn edit() -> impl Strategy<Value = Edit> {
    prop_oneof![any::<bool>().prop_map(Edit::Favorite), any::<bool>().prop_map(Edit::Delivered)]
}

proptest! {
    #[test]
    fn test_repeated_insert_keeps_one_record(
        number in tracking_number(),
        carrier in carrier(),
        repeats in 1usize..8,
    ) {
        let record = LogisticsRecord::new(number, carrier);
        let event = RecordEvent::Insert { record: record.clone() };
        let mut list = RecordList::new();

        for _ in 0..repeats {
            apply_event(&mut list, &event);
        }

        prop_assert_eq!(list.iter().filter(|r| r.id == record.id).count(), 1);
    }

    #[test]
    fn test_offline_create_then_delete_leaves_nothing(
        number in tracking_number(),
        carrier in carrier(),
        edits in prop::collection::vec(edit(), 0..10),
        unrelated in prop::collection::vec(tracking_number(), 0..4),
    ) {
        let record = LogisticsRecord::new(number, carrier);
        let mut outbox = Outbox::new();
        for other in &unrelated {
            outbox.push(PendingMutation::delete(other.clone()));
        }

        outbox.push(PendingMutation::create(record.clone()));
        for edit in &edits {
            let patch = match edit {
                Edit::Favorite(value) => RecordPatch::favorite(*value, Utc::now()),
                Edit::Delivered(value) => RecordPatch::delivered(*value, Utc::now()),
            };
            outbox.push(PendingMutation::update(record.id.clone(), patch));
        }
        prop_assert_eq!(outbox.iter().filter(|m| m.record_id() == record.id).count(), 1);

        outbox.push(PendingMutation::delete(record.id.clone()));

        prop_assert!(!outbox.touches(&record.id));
        prop_assert_eq!(outbox.len(), unrelated.len());
    }

    #[test]
    fn test_share_token_preserves_records(
        entries in prop::collection::vec((".{1,24}", carrier()), 0..6),
    ) {
        let records: Vec<LogisticsRecord> = entries
            .into_iter()
            .map(|(number, carrier)| LogisticsRecord::new(number, carrier))
            .collect();

        let token = encode_snapshot(&records).unwrap();
        prop_assert_eq!(decode_snapshot(&token), Some(records));
    }

    #[test]
    fn test_arbitrary_tokens_never_panic(input in ".*") {
        let _ = decode_snapshot(&input);
    }
}
