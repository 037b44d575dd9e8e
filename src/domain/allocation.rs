//! Oldest-first distribution of a single payment across a member's dues.

use super::due::Due;
use super::money::{Amount, Balance};
use super::period::Period;
use crate::error::{LedgerError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The share of a payment applied to one due.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Allocation {
    pub due: u32,
    pub period: Period,
    pub applied: Balance,
}

/// Result of distributing a payment: one allocation per due examined, in
/// application order, plus whatever could not be applied.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct AllocationPlan {
    pub allocations: Vec<Allocation>,
    pub remainder: Balance,
}

impl AllocationPlan {
    pub fn allocated(&self) -> Balance {
        self.allocations.iter().map(|a| a.applied).sum()
    }

    /// Returns copies of `dues` with this plan's allocations applied.
    ///
    /// Dues that received nothing are returned unchanged. Fails if an allocation
    /// names a due that is not in `dues` or would overpay it.
    pub fn apply(&self, dues: &[Due]) -> Result<Vec<Due>> {
        let mut updated: Vec<Due> = dues.to_vec();
        let index: HashMap<u32, usize> = updated
            .iter()
            .enumerate()
            .map(|(i, due)| (due.id, i))
            .collect();

        for allocation in &self.allocations {
            let i = index.get(&allocation.due).ok_or_else(|| {
                LedgerError::IntegrityError(format!(
                    "Allocation references unknown due {}",
                    allocation.due
                ))
            })?;
            updated[*i].apply(allocation.applied)?;
        }
        Ok(updated)
    }
}

/// Distributes `amount` across `dues`, oldest period first.
///
/// Dues are visited in ascending `(period, id)` order regardless of the order they
/// are passed in. Cancelled or fully paid dues receive a zero allocation. All
/// arithmetic is done in integer cents.
///
/// A due whose paid amount exceeds its amount due fails the whole call with
/// [`LedgerError::IntegrityError`].
pub fn allocate(amount: Amount, dues: &[Due]) -> Result<AllocationPlan> {
    let mut ordered: Vec<&Due> = dues.iter().collect();
    ordered.sort_by_key(|due| (due.period, due.id));

    let mut remaining = Balance::from(amount).cents()?;
    let mut allocations = Vec::with_capacity(ordered.len());

    for due in ordered {
        let gap = due.remaining().cents()?;
        if gap < 0 {
            return Err(LedgerError::IntegrityError(format!(
                "Due {} is overpaid: paid {} of {}",
                due.id, due.amount_paid, due.amount_due
            )));
        }

        let applied = if due.cancelled { 0 } else { remaining.min(gap) };
        remaining -= applied;

        allocations.push(Allocation {
            due: due.id,
            period: due.period,
            applied: Balance::from_cents(applied),
        });
    }

    Ok(AllocationPlan {
        allocations,
        remainder: Balance::from_cents(remaining),
    })
}

/// Like [`allocate`], for callers holding an unvalidated decimal.
pub fn allocate_decimal(amount: Decimal, dues: &[Due]) -> Result<AllocationPlan> {
    allocate(Amount::new(amount)?, dues)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::due::DueStatus;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use rust_decimal_macros::dec;

    fn due(id: u32, period: &str, owed: Decimal, paid: Decimal) -> Due {
        let mut d = Due::new(id, 1, period.parse().unwrap(), Balance::new(owed));
        d.amount_paid = Balance::new(paid);
        d
    }

    fn amount(value: Decimal) -> Amount {
        Amount::new(value).unwrap()
    }

    fn applied(plan: &AllocationPlan) -> Vec<(u32, Balance)> {
        plan.allocations.iter().map(|a| (a.due, a.applied)).collect()
    }

    #[test]
    fn test_spreads_oldest_first() {
        let dues = vec![
            due(1, "2024-01", dec!(100), dec!(0)),
            due(2, "2024-02", dec!(100), dec!(0)),
        ];
        let plan = allocate(amount(dec!(150)), &dues).unwrap();

        assert_eq!(
            applied(&plan),
            vec![(1, Balance::new(dec!(100))), (2, Balance::new(dec!(50)))]
        );
        assert_eq!(plan.remainder, Balance::ZERO);
    }

    #[test]
    fn test_settles_partial_due() {
        let dues = vec![due(1, "2024-01", dec!(100), dec!(40))];
        let plan = allocate(amount(dec!(60)), &dues).unwrap();

        assert_eq!(applied(&plan), vec![(1, Balance::new(dec!(60)))]);
        assert_eq!(plan.remainder, Balance::ZERO);

        let updated = plan.apply(&dues).unwrap();
        assert_eq!(updated[0].status(), DueStatus::Paid);
    }

    #[test]
    fn test_no_dues_leaves_everything_as_remainder() {
        let plan = allocate(amount(dec!(50)), &[]).unwrap();
        assert!(plan.allocations.is_empty());
        assert_eq!(plan.remainder, Balance::new(dec!(50)));
    }

    #[test]
    fn test_fully_paid_due_gets_zero() {
        let dues = vec![due(1, "2024-01", dec!(100), dec!(100))];
        let plan = allocate(amount(dec!(30)), &dues).unwrap();

        assert_eq!(applied(&plan), vec![(1, Balance::ZERO)]);
        assert_eq!(plan.remainder, Balance::new(dec!(30)));
    }

    #[test]
    fn test_zero_amount_is_rejected() {
        let dues = vec![due(1, "2024-01", dec!(100), dec!(0))];
        assert!(matches!(
            allocate_decimal(dec!(0), &dues),
            Err(LedgerError::ValidationError(_))
        ));
        assert!(matches!(
            allocate_decimal(dec!(-5), &dues),
            Err(LedgerError::ValidationError(_))
        ));
    }

    #[test]
    fn test_overpaid_due_is_integrity_error() {
        let dues = vec![
            due(1, "2024-01", dec!(100), dec!(0)),
            due(2, "2024-02", dec!(100), dec!(120)),
        ];
        assert!(matches!(
            allocate(amount(dec!(10)), &dues),
            Err(LedgerError::IntegrityError(_))
        ));
    }

    #[test]
    fn test_input_order_does_not_matter() {
        let dues = vec![
            due(9, "2024-03", dec!(10), dec!(0)),
            due(4, "2024-01", dec!(10), dec!(0)),
            due(2, "2024-01", dec!(10), dec!(0)),
        ];
        let plan = allocate(amount(dec!(15)), &dues).unwrap();

        // Same-period tie broken by id.
        assert_eq!(
            applied(&plan),
            vec![
                (2, Balance::new(dec!(10))),
                (4, Balance::new(dec!(5))),
                (9, Balance::ZERO),
            ]
        );
    }

    #[test]
    fn test_cancelled_due_is_skipped() {
        let mut cancelled = due(1, "2024-01", dec!(100), dec!(0));
        cancelled.cancel();
        let dues = vec![cancelled, due(2, "2024-02", dec!(20), dec!(0))];
        let plan = allocate(amount(dec!(50)), &dues).unwrap();

        assert_eq!(
            applied(&plan),
            vec![(1, Balance::ZERO), (2, Balance::new(dec!(20)))]
        );
        assert_eq!(plan.remainder, Balance::new(dec!(30)));
    }

    #[test]
    fn test_cent_precision_has_no_drift() {
        let dues: Vec<Due> = (1..=10)
            .map(|i| due(i, &format!("2024-{:02}", i), dec!(0.10), dec!(0)))
            .collect();
        let plan = allocate(amount(dec!(0.7)), &dues).unwrap();

        assert_eq!(plan.allocated(), Balance::new(dec!(0.70)));
        assert_eq!(plan.remainder, Balance::ZERO);
        assert_eq!(plan.allocations[6].applied, Balance::new(dec!(0.10)));
        assert_eq!(plan.allocations[7].applied, Balance::ZERO);
    }

    #[test]
    fn test_apply_rejects_unknown_due() {
        let dues = vec![due(1, "2024-01", dec!(100), dec!(0))];
        let plan = allocate(amount(dec!(10)), &dues).unwrap();
        let other = vec![due(2, "2024-01", dec!(100), dec!(0))];
        assert!(matches!(
            plan.apply(&other),
            Err(LedgerError::IntegrityError(_))
        ));
    }

    #[test]
    fn test_random_conservation_and_bounds() {
        let mut rng = StdRng::seed_from_u64(0x5eed);

        for _ in 0..500 {
            let count = rng.gen_range(0..8);
            let dues: Vec<Due> = (0..count)
                .map(|i| {
                    let owed = rng.gen_range(1..50_000i64);
                    let paid = rng.gen_range(0..=owed);
                    let mut d = Due::new(
                        i,
                        1,
                        Period::new(2020 + rng.gen_range(0..3), rng.gen_range(1..=12)).unwrap(),
                        Balance::from_cents(owed),
                    );
                    d.amount_paid = Balance::from_cents(paid);
                    d
                })
                .collect();
            let paid_in = Amount::new(Balance::from_cents(rng.gen_range(1..200_000)).value())
                .unwrap();

            let plan = allocate(paid_in, &dues).unwrap();
            assert_eq!(plan.allocated() + plan.remainder, Balance::from(paid_in));
            assert!(plan.remainder >= Balance::ZERO);

            let updated = plan.apply(&dues).unwrap();
            for d in &updated {
                assert!(d.amount_paid <= d.amount_due);
            }

            // Identical input, identical output.
            assert_eq!(allocate(paid_in, &dues).unwrap(), plan);
        }
    }
}
