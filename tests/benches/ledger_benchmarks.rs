//! # Ledger Benchmarks
//!
//! | Path | Measured |
//! |------|----------|
//! | Transaction pipeline | push of one signed transfer |
//! | Undo | dropping pending transactions |
//! | Blocks | producing a block from N pending transfers |
//! | Authority | verifying a 2-of-2 multisig |
//! | Fees | fee of a transfer under the default schedule |

use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use ledger_chain::domain::SignState;
use ledger_chain::test_utils::*;
use shared_types::{
    AccountId, FeeSchedule, Operation, Price, RequiredAuthorities, TransferOperation, CORE_ASSET,
};
use std::time::Duration;

fn transfer(from: AccountId, to: AccountId, amount: i64) -> Operation {
    TransferOperation {
        fee: core(0),
        from,
        to,
        amount: core(amount),
        memo: None,
    }
    .into()
}

/// Chain with `count` distinct alice -> bob transfers pending.
fn chain_with_pending(count: usize) -> TestChain {
    let mut chain = TestChain::new();
    let (alice, bob) = (chain.account("alice"), chain.account("bob"));
    for amount in 1..=count as i64 {
        chain.push(&["alice"], vec![transfer(alice, bob, amount)]).unwrap();
    }
    chain
}

// ============================================================================
// TRANSACTION PIPELINE
// ============================================================================

fn bench_push_transaction(c: &mut Criterion) {
    let mut group = c.benchmark_group("transactions");
    group.measurement_time(Duration::from_secs(10));

    group.bench_function("push_signed_transfer", |b| {
        b.iter_batched(
            || {
                let chain = TestChain::new();
                let (alice, bob) = (chain.account("alice"), chain.account("bob"));
                let trx = chain.sign(&["alice"], vec![transfer(alice, bob, 10)]);
                (chain, trx)
            },
            |(mut chain, trx)| black_box(chain.db.push_transaction(trx).unwrap()),
            BatchSize::SmallInput,
        )
    });

    group.bench_function("clear_pending_100", |b| {
        b.iter_batched(
            || chain_with_pending(100),
            |mut chain| chain.db.clear_pending().unwrap(),
            BatchSize::SmallInput,
        )
    });

    group.finish();
}

// ============================================================================
// BLOCKS
// ============================================================================

fn bench_produce_block(c: &mut Criterion) {
    let mut group = c.benchmark_group("blocks");

    for size in [1, 10, 100] {
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("produce_block", size), &size, |b, &size| {
            b.iter_batched(
                || chain_with_pending(size),
                |mut chain| black_box(chain.produce_block()),
                BatchSize::SmallInput,
            )
        });
    }

    group.bench_function("produce_and_pop", |b| {
        let mut chain = TestChain::new();
        b.iter(|| {
            chain.produce_block();
            black_box(chain.db.pop_block().unwrap())
        })
    });

    group.finish();
}

// ============================================================================
// AUTHORITY AND FEES
// ============================================================================

fn bench_authority(c: &mut Criterion) {
    let chain = TestChain::new();
    let alice = chain.account("alice");
    let keys = [chain.key("alice").public_key(), chain.key("bob").public_key()];
    let required = RequiredAuthorities {
        active: [alice].into(),
        ..Default::default()
    };
    let max_depth = chain.db.parameters().unwrap().max_authority_depth;

    c.bench_function("authority/verify_single_account", |b| {
        b.iter(|| {
            let mut state = SignState::new(keys, max_depth);
            black_box(state.verify(&required, &chain.db, false).is_ok())
        })
    });
}

fn bench_fees(c: &mut Criterion) {
    let schedule = FeeSchedule::default();
    let chain = TestChain::new();
    let op = transfer(chain.account("alice"), chain.account("bob"), 10);
    let rate = Price::unit_price(CORE_ASSET);

    c.bench_function("fees/calculate_transfer", |b| {
        b.iter(|| black_box(schedule.calculate_fee(&op, &rate).unwrap()))
    });
}

criterion_group!(
    benches,
    bench_push_transaction,
    bench_produce_block,
    bench_authority,
    bench_fees
);
criterion_main!(benches);
