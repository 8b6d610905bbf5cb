use std::collections::HashMap;

use proptest::prelude::*;
use serde_json::json;

use oplog::{
    checksum::{self, ChecksumAlgorithm},
    core::store::OperationLog,
    identity::DeviceIdentity,
    op::Operation,
    types::{OperationId, OperationType},
};

#[derive(Debug, Clone)]
enum Action {
    Append { kind: u8, entity: u8 },
    Ack { targets: Vec<u8>, with_seq: bool },
    AckUnknown,
    Clear,
}

fn action_strategy() -> impl Strategy<Value = Action> {
    prop_oneof![
        6 => (0u8..20, 0u8..8).prop_map(|(kind, entity)| Action::Append { kind, entity }),
        3 => (prop::collection::vec(0u8..64, 0..6), any::<bool>())
            .prop_map(|(targets, with_seq)| Action::Ack { targets, with_seq }),
        1 => Just(Action::AckUnknown),
        1 => Just(Action::Clear),
    ]
}

fn full_scan_pending(log: &OperationLog) -> usize {
    log.operations().iter().filter(|op| op.synced_at.is_none()).count()
}

proptest! {
    #[test]
    fn pending_count_matches_full_scan(actions in prop::collection::vec(action_strategy(), 1..150)) {
        let identity = DeviceIdentity::generate();
        let mut log = OperationLog::new();
        let mut next_seq = 1u64;
        let mut now = 0i64;

        for action in actions {
            now += 1;
            match action {
                Action::Append { kind, entity } => {
                    let op_type = OperationType::ALL[usize::from(kind) % OperationType::ALL.len()];
                    let op = Operation::new(
                        op_type,
                        op_type.entity_type(),
                        format!("e{entity}"),
                        json!({"n": now}),
                        &identity,
                        ChecksumAlgorithm::Sha256,
                        now,
                    );
                    prop_assert!(log.append(op).is_ok());
                }
                Action::Ack { targets, with_seq } => {
                    let ops = log.operations();
                    if ops.is_empty() {
                        continue;
                    }
                    let ids: Vec<OperationId> = targets
                        .iter()
                        .map(|t| ops[usize::from(*t) % ops.len()].id.clone())
                        .collect();
                    let mut seqs = HashMap::new();
                    if with_seq {
                        for id in &ids {
                            seqs.insert(id.clone(), next_seq);
                            next_seq += 1;
                        }
                    }
                    let plan = log.plan_acks(&ids, &seqs, now);
                    prop_assert!(plan.missing.is_empty());
                    log.apply_acks(&plan.acks);
                }
                Action::AckUnknown => {
                    let before = log.len();
                    let plan = log.plan_acks(&["unknown".to_string()], &HashMap::new(), now);
                    prop_assert_eq!(plan.missing.len(), 1);
                    log.apply_acks(&plan.acks);
                    prop_assert_eq!(log.len(), before);
                }
                Action::Clear => log.clear(),
            }

            prop_assert_eq!(log.pending_count(), full_scan_pending(&log));
            prop_assert_eq!(log.pending().len(), log.pending_count());
        }
    }

    #[test]
    fn checksum_is_stable_and_sensitive(a in "[a-z]{0,24}", b in "[a-z]{0,24}") {
        let pa = json!({"title": &a, "content": ""});
        let pb = json!({"title": &b, "content": ""});
        let ca = checksum::compute(&pa, ChecksumAlgorithm::Sha256);
        prop_assert_eq!(&ca, &checksum::compute(&pa.clone(), ChecksumAlgorithm::Sha256));
        prop_assert!(checksum::verify(&pa, &ca));
        if a != b {
            prop_assert_ne!(ca, checksum::compute(&pb, ChecksumAlgorithm::Sha256));
        }
    }
}
