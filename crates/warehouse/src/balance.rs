//! Balance derivation: on-hand quantities are never stored, they are folded
//! from the ledger.

use std::collections::HashMap;

use stockbook_core::{LocationId, SkuId};

use crate::movement::Movement;

/// Grouping key of the balance fold.
pub type BalanceKey = (SkuId, LocationId);

/// Fold signed deltas per (SKU, location) pair.
///
/// The fold is a plain sum, so the result is independent of iteration order;
/// the storage-side aggregate and this client-side fold must agree for any
/// ledger contents.
pub fn fold_balances<'a>(
    movements: impl IntoIterator<Item = &'a Movement>,
) -> HashMap<BalanceKey, i64> {
    let mut balances: HashMap<BalanceKey, i64> = HashMap::new();
    for m in movements {
        *balances.entry((m.sku_id, m.loc_id)).or_insert(0) += m.signed_delta();
    }
    balances
}

/// Running-balance accumulator for the fallback detail strategy.
///
/// Keyed by `(sku_id, loc_id)`, never by location alone: two SKUs sharing a
/// bin must not commingle in one accumulator. Each key is seeded at zero on
/// first sight.
#[derive(Debug, Default)]
pub struct RunningBalances {
    totals: HashMap<BalanceKey, i64>,
}

impl RunningBalances {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one movement's signed delta and return the running balance for
    /// its (SKU, location) pair up to and including this movement.
    pub fn apply(&mut self, sku_id: SkuId, loc_id: LocationId, signed_delta: i64) -> i64 {
        let total = self.totals.entry((sku_id, loc_id)).or_insert(0);
        *total += signed_delta;
        *total
    }
}

/// Running balance per row for movements already in ascending ledger order.
/// Only the relative order within each (SKU, location) pair matters.
pub fn running_trace<'a>(ordered: impl IntoIterator<Item = &'a Movement>) -> Vec<i64> {
    let mut acc = RunningBalances::new();
    ordered
        .into_iter()
        .map(|m| acc.apply(m.sku_id, m.loc_id, m.signed_delta()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::movement::MovementType;
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;
    use stockbook_core::{MovementId, UserId};

    fn movement(id: i64, sku: i64, loc: i64, ty: MovementType, qty: i64) -> Movement {
        Movement {
            id: MovementId::new(id),
            sku_id: SkuId::new(sku),
            loc_id: LocationId::new(loc),
            movement_type: ty,
            quantity_change: qty,
            reference: String::new(),
            user_id: UserId::new(1),
            created_at: Utc.timestamp_opt(1_700_000_000 + id, 0).unwrap(),
        }
    }

    #[test]
    fn fold_sums_signed_deltas_per_pair() {
        let ledger = vec![
            movement(1, 1, 1, MovementType::In, 10),
            movement(2, 1, 1, MovementType::Out, 3),
            movement(3, 1, 2, MovementType::In, 4),
            movement(4, 2, 1, MovementType::Adjustment, -2),
        ];
        let balances = fold_balances(&ledger);
        assert_eq!(balances[&(SkuId::new(1), LocationId::new(1))], 7);
        assert_eq!(balances[&(SkuId::new(1), LocationId::new(2))], 4);
        assert_eq!(balances[&(SkuId::new(2), LocationId::new(1))], -2);
    }

    #[test]
    fn accumulator_keys_by_sku_and_location() {
        // Two SKUs in the same bin must not share an accumulator.
        let ledger = vec![
            movement(1, 1, 1, MovementType::In, 10),
            movement(2, 2, 1, MovementType::In, 5),
            movement(3, 1, 1, MovementType::Out, 4),
        ];
        assert_eq!(running_trace(&ledger), vec![10, 5, 6]);
    }

    /// Quadratic oracle: running balance of row i is the sum of signed
    /// deltas of all rows at or before i sharing its (SKU, location) pair.
    fn prefix_sum_oracle(ordered: &[Movement]) -> Vec<i64> {
        ordered
            .iter()
            .enumerate()
            .map(|(i, m)| {
                ordered[..=i]
                    .iter()
                    .filter(|n| n.sku_id == m.sku_id && n.loc_id == m.loc_id)
                    .map(|n| n.signed_delta())
                    .sum()
            })
            .collect()
    }

    fn arb_ledger() -> impl Strategy<Value = Vec<Movement>> {
        prop::collection::vec((0i64..4, 0i64..3, 0usize..3, 1i64..100), 0..40).prop_map(
            |entries| {
                entries
                    .into_iter()
                    .enumerate()
                    .map(|(i, (sku, loc, ty, qty))| {
                        let (ty, qty) = match ty {
                            0 => (MovementType::In, qty),
                            1 => (MovementType::Out, qty),
                            // Alternate adjustment signs off the quantity parity.
                            _ => (MovementType::Adjustment, if qty % 2 == 0 { qty } else { -qty }),
                        };
                        movement(i as i64 + 1, sku, loc, ty, qty)
                    })
                    .collect()
            },
        )
    }

    proptest! {
        /// The fold is order-independent: any permutation of the ledger
        /// yields the same balances.
        #[test]
        fn fold_is_commutative(ledger in arb_ledger(), seed in any::<u64>()) {
            let folded = fold_balances(&ledger);

            let mut shuffled = ledger.clone();
            // Deterministic Fisher-Yates driven by the seed.
            let mut state = seed | 1;
            for i in (1..shuffled.len()).rev() {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                let j = (state % (i as u64 + 1)) as usize;
                shuffled.swap(i, j);
            }

            prop_assert_eq!(fold_balances(&shuffled), folded);
        }

        /// The linear accumulator agrees with the quadratic prefix-sum
        /// oracle on every row.
        #[test]
        fn running_trace_matches_prefix_sums(ledger in arb_ledger()) {
            prop_assert_eq!(running_trace(&ledger), prefix_sum_oracle(&ledger));
        }

        /// The last running balance of each pair equals the folded balance.
        #[test]
        fn final_running_balance_equals_fold(ledger in arb_ledger()) {
            let trace = running_trace(&ledger);
            let folded = fold_balances(&ledger);

            let mut last_seen: HashMap<BalanceKey, i64> = HashMap::new();
            for (m, rb) in ledger.iter().zip(&trace) {
                last_seen.insert((m.sku_id, m.loc_id), *rb);
            }
            prop_assert_eq!(last_seen, folded);
        }
    }
}
