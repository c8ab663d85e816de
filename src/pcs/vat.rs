/// VAT portion of a gross (VAT-inclusive) amount at a whole-percent rate,
/// in minor units. Floor division keeps the result deterministic.
pub fn vat_portion(gross: i64, rate_percent: i64) -> i64 {
    if rate_percent <= 0 || gross <= 0 {
        return 0;
    }
    gross * rate_percent / (100 + rate_percent)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VatBreakdown {
    /// Input VAT contained in the gross component purchase prices.
    pub deductible: i64,
    /// Outgoing VAT contained in the gross sale (or asking) price.
    pub outgoing: i64,
}

pub fn compute(components_total: i64, gross_price: Option<i64>, rate_percent: i64) -> VatBreakdown {
    VatBreakdown {
        deductible: vat_portion(components_total, rate_percent),
        outgoing: vat_portion(gross_price.unwrap_or(0), rate_percent),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vat_portion_of_gross() {
        // 125 gross at 25% contains 25 of VAT
        assert_eq!(vat_portion(125, 25), 25);
        assert_eq!(vat_portion(1250, 25), 250);
        // 120 gross at 20% contains 20
        assert_eq!(vat_portion(120, 20), 20);
    }

    #[test]
    fn zero_and_negative_inputs_yield_zero() {
        assert_eq!(vat_portion(0, 25), 0);
        assert_eq!(vat_portion(100, 0), 0);
        assert_eq!(vat_portion(-5, 25), 0);
    }

    #[test]
    fn compute_is_pure_and_idempotent() {
        let a = compute(1250, Some(2500), 25);
        let b = compute(1250, Some(2500), 25);
        assert_eq!(a, b);
        assert_eq!(a.deductible, 250);
        assert_eq!(a.outgoing, 500);
    }

    #[test]
    fn missing_price_means_no_outgoing_vat() {
        let v = compute(1250, None, 25);
        assert_eq!(v.outgoing, 0);
        assert_eq!(v.deductible, 250);
    }
}
