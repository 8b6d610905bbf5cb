use std::collections::HashMap;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::json;

use oplog::{
    checksum::ChecksumAlgorithm,
    core::store::OperationLog,
    identity::DeviceIdentity,
    op::Operation,
    types::{OperationId, OperationType},
};

fn op(identity: &DeviceIdentity, i: u64, algorithm: ChecksumAlgorithm) -> Operation {
    Operation::new(
        OperationType::NoteUpdated,
        OperationType::NoteUpdated.entity_type(),
        format!("n{}", i % 500),
        json!({"fields": ["content"], "changes": {"content": format!("body {i}")}}),
        identity,
        algorithm,
        i as i64,
    )
}

fn filled_log(n: u64) -> OperationLog {
    let identity = DeviceIdentity::generate();
    let mut log = OperationLog::new();
    for i in 0..n {
        log.append(op(&identity, i, ChecksumAlgorithm::Sha256))
            .expect("append");
    }
    log
}

fn bench_appends(c: &mut Criterion) {
    let identity = DeviceIdentity::generate();
    let mut group = c.benchmark_group("log_append_10k");
    for algorithm in [ChecksumAlgorithm::Legacy, ChecksumAlgorithm::Sha256] {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{algorithm:?}")),
            &algorithm,
            |b, &algorithm| {
                b.iter(|| {
                    let mut log = OperationLog::new();
                    for i in 0..10_000u64 {
                        log.append(op(&identity, i, algorithm)).expect("append");
                    }
                });
            },
        );
    }
    group.finish();
}

fn bench_ack_batch(c: &mut Criterion) {
    c.bench_function("log_ack_10k", |b| {
        b.iter(|| {
            let mut log = filled_log(10_000);
            let ids: Vec<OperationId> = log.operations().iter().map(|o| o.id.clone()).collect();
            let plan = log.plan_acks(&ids, &HashMap::new(), 1);
            log.apply_acks(&plan.acks);
        });
    });
}

fn bench_entity_query(c: &mut Criterion) {
    let log = filled_log(50_000);
    c.bench_function("by_entity_50k", |b| {
        b.iter(|| {
            let _ = log.by_entity("n42");
        });
    });
    c.bench_function("pending_scan_50k", |b| {
        b.iter(|| {
            let _ = log.pending();
        });
    });
}

criterion_group!(benches, bench_appends, bench_ack_batch, bench_entity_query);
criterion_main!(benches);
