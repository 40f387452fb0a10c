use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use chrono::{TimeZone, Utc};

use stockbook_core::{LocationId, MovementId, SkuId, UserId};
use stockbook_infra::store::{InMemoryLedgerStore, LedgerStore};
use stockbook_warehouse::{Movement, MovementType, NewMovement, Page, fold_balances, running_trace};

const SKUS: i64 = 20;
const BINS: i64 = 10;

/// Deterministic pseudo-random ledger (LCG; no RNG dependency needed).
fn synthetic_ledger(len: usize) -> Vec<Movement> {
    let mut state: u64 = 0x5DEECE66D;
    let mut next = |bound: u64| {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        state % bound
    };

    (0..len)
        .map(|i| {
            let sku = next(SKUS as u64) as i64 + 1;
            let bin = next(BINS as u64) as i64 + 1;
            let qty = next(50) as i64 + 1;
            // IN-heavy mix keeps balances non-negative without bookkeeping.
            let ty = match next(4) {
                0 | 1 => MovementType::In,
                2 => MovementType::Adjustment,
                _ => MovementType::In,
            };
            Movement {
                id: MovementId::new(i as i64 + 1),
                sku_id: SkuId::new(sku),
                loc_id: LocationId::new(bin),
                movement_type: ty,
                quantity_change: qty,
                reference: String::new(),
                user_id: UserId::new(1),
                created_at: Utc.timestamp_opt(1_700_000_000 + i as i64, 0).unwrap(),
            }
        })
        .collect()
}

fn bench_balance_fold(c: &mut Criterion) {
    let mut group = c.benchmark_group("balance_fold");
    for len in [1_000usize, 10_000] {
        let ledger = synthetic_ledger(len);
        group.throughput(Throughput::Elements(len as u64));
        group.bench_with_input(BenchmarkId::new("fold_balances", len), &ledger, |b, ledger| {
            b.iter(|| black_box(fold_balances(ledger.iter())));
        });
        group.bench_with_input(BenchmarkId::new("running_trace", len), &ledger, |b, ledger| {
            b.iter(|| black_box(running_trace(ledger.iter())));
        });
    }
    group.finish();
}

fn bench_store_queries(c: &mut Criterion) {
    let rt = tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("tokio runtime");

    let store = InMemoryLedgerStore::new();
    rt.block_on(async {
        for s in 0..SKUS {
            store
                .create_sku(&format!("SKU-{s:03}"), "bench")
                .await
                .unwrap();
        }
        for l in 0..BINS {
            store
                .create_location("R1", &format!("{}", l + 1), "A", "FRONT")
                .await
                .unwrap();
        }
        for m in synthetic_ledger(10_000) {
            store
                .append_movement(&NewMovement {
                    sku_id: m.sku_id,
                    loc_id: m.loc_id,
                    movement_type: m.movement_type,
                    quantity_change: m.quantity_change,
                    reference: m.reference,
                    user_id: m.user_id,
                })
                .await
                .unwrap();
        }
    });

    let mut group = c.benchmark_group("store_queries");
    group.bench_function("balances_page", |b| {
        b.iter(|| {
            rt.block_on(async {
                black_box(store.balances("SKU-", Page::clamped(1, 50)).await.unwrap())
            })
        });
    });
    group.bench_function("movement_details", |b| {
        b.iter(|| rt.block_on(async { black_box(store.movement_details("SKU-").await.unwrap()) }));
    });
    group.finish();
}

criterion_group!(benches, bench_balance_fold, bench_store_queries);
criterion_main!(benches);
