//! # Billing Math
//!
//! Pure invoice computation: full totals, post-hoc discount repricing,
//! and split shares with exact minor-unit conservation.
//!
//! ## Computation Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Invoice Computation                                 │
//! │                                                                         │
//! │  subtotal = Σ quantity × unit_price   (billable items only)            │
//! │  tax      = subtotal × tax_rate       (from subtotal, no compounding)  │
//! │  service  = subtotal × service_rate   (from subtotal, no compounding)  │
//! │  total    = subtotal + tax + service − discount − deposit + tip        │
//! │                                                                         │
//! │  SPLITS: every component is floor-divided by N independently;          │
//! │  the LAST split absorbs each component's remainder. Components         │
//! │  are never derived from each other post-rounding, so the sum of        │
//! │  split[i].X equals undivided X for every component X, exactly.         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All functions here are deterministic and I/O-free. The service layer
//! is responsible for handing them a FRESH session snapshot.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::{Money, Rate};

// =============================================================================
// Invoice Totals
// =============================================================================

/// The computed monetary components of a full (non-split) invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InvoiceTotals {
    pub subtotal: Money,
    pub tax: Money,
    pub service_charge: Money,
    pub discount: Money,
    pub deposit_credit: Money,
    pub tip: Money,
    pub total: Money,
}

/// Computes full-invoice totals from a live subtotal.
///
/// Tax and service charge are both computed from the subtotal, never
/// from each other, so there is no compounding.
///
/// ## Errors
/// `EmptyOrder` if the subtotal is zero: a session whose every order
/// was cancelled has nothing to bill.
pub fn invoice_totals(
    session_id: &str,
    subtotal: Money,
    tax_rate: Rate,
    service_rate: Rate,
    discount: Money,
    deposit_credit: Money,
) -> CoreResult<InvoiceTotals> {
    if subtotal.is_zero() {
        return Err(CoreError::EmptyOrder {
            session_id: session_id.to_string(),
        });
    }

    let tax = subtotal.apply_rate(tax_rate);
    let service_charge = subtotal.apply_rate(service_rate);
    let total = subtotal + tax + service_charge - discount - deposit_credit;

    Ok(InvoiceTotals {
        subtotal,
        tax,
        service_charge,
        discount,
        deposit_credit,
        tip: Money::zero(),
        total,
    })
}

/// Recomputes an invoice total after a discount change.
///
/// Used by post-generation discount application: every other component
/// is frozen at generation time, only the discount (and therefore the
/// total) moves. `amount_paid` is untouched.
pub fn reprice_with_discount(
    subtotal: Money,
    tax: Money,
    service_charge: Money,
    new_discount: Money,
    deposit_credit: Money,
    tip: Money,
) -> Money {
    subtotal + tax + service_charge - new_discount - deposit_credit + tip
}

// =============================================================================
// Split Shares
// =============================================================================

/// One guest's share of an N-way split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SplitShare {
    /// 1-based split index.
    pub index: u32,
    /// Total number of splits.
    pub of: u32,
    pub subtotal: Money,
    pub tax: Money,
    pub service_charge: Money,
    pub discount: Money,
    pub tip: Money,
    pub total: Money,
}

impl SplitShare {
    /// Renders the `-k/N` invoice number suffix for this share.
    pub fn number_suffix(&self) -> String {
        format!("-{}/{}", self.index, self.of)
    }
}

/// Computes N-way split shares from one live session snapshot.
///
/// Every monetary component (subtotal, tax, service, discount, tip,
/// and the undivided total itself) is split independently with the
/// floor-plus-remainder-to-last rule, guaranteeing
/// `Σ share[i].component == undivided component` with zero residual
/// for every component, regardless of N or divisibility.
///
/// Deposits are not split; shares carry no deposit credit.
///
/// ## Errors
/// - `EmptyOrder` if the subtotal is zero
/// - `Validation` if `split_count` is outside `[2, MAX_SPLIT_COUNT]`
pub fn split_totals(
    session_id: &str,
    subtotal: Money,
    tax_rate: Rate,
    service_rate: Rate,
    discount: Money,
    tip: Money,
    split_count: u32,
) -> CoreResult<Vec<SplitShare>> {
    crate::validation::validate_split_count(split_count)?;

    if subtotal.is_zero() {
        return Err(CoreError::EmptyOrder {
            session_id: session_id.to_string(),
        });
    }

    let tax = subtotal.apply_rate(tax_rate);
    let service_charge = subtotal.apply_rate(service_rate);
    let full_total = subtotal + tax + service_charge - discount + tip;

    let subtotals = subtotal.split_even(split_count);
    let taxes = tax.split_even(split_count);
    let services = service_charge.split_even(split_count);
    let discounts = discount.split_even(split_count);
    let tips = tip.split_even(split_count);
    let totals = full_total.split_even(split_count);

    let shares = (0..split_count as usize)
        .map(|i| SplitShare {
            index: i as u32 + 1,
            of: split_count,
            subtotal: subtotals[i],
            tax: taxes[i],
            service_charge: services[i],
            discount: discounts[i],
            tip: tips[i],
            total: totals[i],
        })
        .collect();

    Ok(shares)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // Scenario: one order with 2× Mojito @ 85,000 and 1× Nachos @ 45,000
    const SUBTOTAL: i64 = 215_000;

    #[test]
    fn test_full_invoice_tax_and_service_from_subtotal() {
        let totals = invoice_totals(
            "s-1",
            Money::from_minor(SUBTOTAL),
            Rate::from_percent(10),
            Rate::from_percent(5),
            Money::zero(),
            Money::zero(),
        )
        .unwrap();

        assert_eq!(totals.subtotal.minor(), 215_000);
        assert_eq!(totals.tax.minor(), 21_500);
        assert_eq!(totals.service_charge.minor(), 10_750);
        assert_eq!(totals.total.minor(), 247_250);
    }

    #[test]
    fn test_full_invoice_discount_and_deposit() {
        let totals = invoice_totals(
            "s-1",
            Money::from_minor(SUBTOTAL),
            Rate::from_percent(10),
            Rate::from_percent(5),
            Money::from_minor(20_000),
            Money::from_minor(50_000),
        )
        .unwrap();

        assert_eq!(totals.total.minor(), 247_250 - 20_000 - 50_000);
    }

    #[test]
    fn test_empty_order_rejected() {
        let err = invoice_totals(
            "s-1",
            Money::zero(),
            Rate::from_percent(10),
            Rate::from_percent(5),
            Money::zero(),
            Money::zero(),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::EmptyOrder { .. }));
    }

    #[test]
    fn test_reprice_with_discount() {
        let total = reprice_with_discount(
            Money::from_minor(215_000),
            Money::from_minor(21_500),
            Money::from_minor(10_750),
            Money::from_minor(30_000),
            Money::zero(),
            Money::zero(),
        );
        assert_eq!(total.minor(), 217_250);
    }

    #[test]
    fn test_three_way_split_scenario() {
        let shares = split_totals(
            "s-1",
            Money::from_minor(SUBTOTAL),
            Rate::from_percent(10),
            Rate::from_percent(5),
            Money::zero(),
            Money::zero(),
            3,
        )
        .unwrap();

        // floor(215,000 / 3) = 71,666 for splits 1-2; split 3 absorbs
        assert_eq!(shares[0].subtotal.minor(), 71_666);
        assert_eq!(shares[1].subtotal.minor(), 71_666);
        assert_eq!(shares[2].subtotal.minor(), 71_668);

        // Same rule applied directly to the undivided total 247,250
        assert_eq!(shares[0].total.minor(), 82_416);
        assert_eq!(shares[1].total.minor(), 82_416);
        assert_eq!(shares[2].total.minor(), 82_418);

        let total_sum: i64 = shares.iter().map(|s| s.total.minor()).sum();
        assert_eq!(total_sum, 247_250);
    }

    #[test]
    fn test_split_suffixes() {
        let shares = split_totals(
            "s-1",
            Money::from_minor(100_000),
            Rate::zero(),
            Rate::zero(),
            Money::zero(),
            Money::zero(),
            2,
        )
        .unwrap();
        assert_eq!(shares[0].number_suffix(), "-1/2");
        assert_eq!(shares[1].number_suffix(), "-2/2");
    }

    #[test]
    fn test_split_count_bounds() {
        let one = split_totals(
            "s-1",
            Money::from_minor(100_000),
            Rate::zero(),
            Rate::zero(),
            Money::zero(),
            Money::zero(),
            1,
        );
        assert!(matches!(one, Err(CoreError::Validation(_))));
    }

    #[test]
    fn test_split_empty_order_rejected() {
        let err = split_totals(
            "s-1",
            Money::zero(),
            Rate::from_percent(10),
            Rate::zero(),
            Money::zero(),
            Money::zero(),
            2,
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::EmptyOrder { .. }));
    }

    /// Conservation property: for randomized subtotals and split counts,
    /// every component sums back to its undivided value exactly.
    #[test]
    fn test_split_conservation_randomized() {
        use rand::Rng;
        let mut rng = rand::thread_rng();

        for _ in 0..500 {
            let subtotal = Money::from_minor(rng.gen_range(1..=5_000_000));
            let discount = Money::from_minor(rng.gen_range(0..=50_000));
            let tip = Money::from_minor(rng.gen_range(0..=100_000));
            let tax_rate = Rate::from_bps(rng.gen_range(0..=2500));
            let service_rate = Rate::from_bps(rng.gen_range(0..=1500));
            let n: u32 = rng.gen_range(2..=10);

            let shares =
                split_totals("s-r", subtotal, tax_rate, service_rate, discount, tip, n).unwrap();
            assert_eq!(shares.len(), n as usize);

            let tax = subtotal.apply_rate(tax_rate);
            let service = subtotal.apply_rate(service_rate);
            let full_total = subtotal + tax + service - discount + tip;

            let sum = |f: fn(&SplitShare) -> Money| {
                shares.iter().map(|s| f(s).minor()).sum::<i64>()
            };

            assert_eq!(sum(|s| s.subtotal), subtotal.minor());
            assert_eq!(sum(|s| s.tax), tax.minor());
            assert_eq!(sum(|s| s.service_charge), service.minor());
            assert_eq!(sum(|s| s.discount), discount.minor());
            assert_eq!(sum(|s| s.tip), tip.minor());
            assert_eq!(sum(|s| s.total), full_total.minor());

            // Shares 1..n-1 are identical floors; only the last differs
            for pair in shares[..shares.len() - 1].windows(2) {
                assert_eq!(pair[0].total, pair[1].total);
            }
        }
    }
}
