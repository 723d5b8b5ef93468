use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Splits `total_amount` into TWAP slices per spec §4.M's algorithm.
///
/// `min_order_amount` is `U`. `n = floor(T / U)` full slices of size `U`,
/// remainder `r = T - n*U`. If `r < U` and not `reduce_only`, the remainder
/// merges into the last slice; otherwise (including the `reduce_only`
/// sub-minimum-tail case) it becomes its own trailing slice.
pub fn twap_slices(total_amount: Decimal, min_order_amount: Decimal, reduce_only: bool) -> Vec<Decimal> {
    if min_order_amount <= Decimal::ZERO {
        return Vec::new();
    }

    let n = (total_amount / min_order_amount).floor();
    let full_slices = n.to_u64().unwrap_or(0);
    let r = total_amount - n * min_order_amount;

    let mut slices: Vec<Decimal> = (0..full_slices).map(|_| min_order_amount).collect();

    if r <= Decimal::ZERO {
        return slices;
    }

    if r < min_order_amount && !reduce_only {
        if let Some(last) = slices.last_mut() {
            *last += r;
        } else {
            // Sub-minimum total with reduce_only=false and no full slices:
            // cannot trade at all.
            return Vec::new();
        }
    } else {
        slices.push(r);
    }

    slices
}

/// `max(duration_s / slice_count, wait_s)`, the inter-slice delay (spec
/// §4.M). Callers that cancel the scheduler mid-run should stop awaiting
/// this delay rather than letting pending slices submit.
pub fn inter_slice_delay_secs(duration_s: f64, slice_count: usize, wait_s: f64) -> f64 {
    if slice_count == 0 {
        return wait_s;
    }
    (duration_s / slice_count as f64).max(wait_s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const U: Decimal = dec!(0.002);

    #[test]
    fn sub_minimum_non_reduce_only_cannot_trade() {
        assert_eq!(twap_slices(dec!(0.001), U, false), Vec::<Decimal>::new());
    }

    #[test]
    fn sub_minimum_reduce_only_trades_the_remainder() {
        assert_eq!(twap_slices(dec!(0.001), U, true), vec![dec!(0.001)]);
    }

    #[test]
    fn remainder_merges_into_last_slice_when_small_and_not_reduce_only() {
        assert_eq!(twap_slices(dec!(0.005), U, false), vec![dec!(0.002), dec!(0.003)]);
    }

    #[test]
    fn remainder_is_its_own_slice_when_reduce_only() {
        assert_eq!(twap_slices(dec!(0.005), U, true), vec![dec!(0.002), dec!(0.002), dec!(0.001)]);
    }

    #[test]
    fn larger_total_non_reduce_only() {
        assert_eq!(twap_slices(dec!(0.009), U, false), vec![dec!(0.002), dec!(0.002), dec!(0.002), dec!(0.003)]);
    }

    #[test]
    fn larger_total_reduce_only() {
        assert_eq!(
            twap_slices(dec!(0.009), U, true),
            vec![dec!(0.002), dec!(0.002), dec!(0.002), dec!(0.002), dec!(0.001)]
        );
    }

    #[test]
    fn exact_multiple_has_no_remainder_slice() {
        assert_eq!(twap_slices(dec!(0.004), U, false), vec![dec!(0.002), dec!(0.002)]);
    }

    #[test]
    fn inter_slice_delay_respects_minimum_wait() {
        assert_eq!(inter_slice_delay_secs(10.0, 4, 5.0), 5.0);
        assert_eq!(inter_slice_delay_secs(100.0, 4, 5.0), 25.0);
    }
}
