use alloy::primitives::U256;
use thiserror::Error;

// ── Fixed-point and time constants ───────────────────────────────────

/// Seconds in a 365-day year, the compounding period count.
pub const SECONDS_PER_YEAR: u32 = 31_536_000;

/// RAY is the 27-decimal fixed-point unit Aave-style protocols use for
/// rates (1.5% = 0.015 * 1e27).
pub const RAY: f64 = 1e27;

/// WAD is the 18-decimal fixed-point unit Compound-style protocols use
/// for per-second rates.
pub const WAD: f64 = 1e18;

/// Reject any rate whose annualized equivalent exceeds this ratio
/// (10.0 = 1000%). A heuristic guard against corrupted upstream data,
/// not a business rule; recalibrate per deployment if needed.
pub const MAX_SANE_ANNUAL_RATE: f64 = 10.0;

// ── Rate input ───────────────────────────────────────────────────────

/// A decimal interest rate, tagged by its period so the annualizer
/// knows whether to divide by seconds-per-year first.
///
/// Both variants hold plain ratios: the fixed-point base (RAY or WAD)
/// must already be divided out. See [`ray_to_ratio`] and
/// [`wad_per_second_to_ratio`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnnualizedRate {
    /// Rate accrued each second (e.g. Comet's supply rate).
    PerSecond(f64),
    /// Simple annual rate / APR (e.g. Aave's liquidity rate).
    Annual(f64),
}

impl AnnualizedRate {
    /// The rate normalized to a simple annual ratio.
    fn annual(self, seconds_per_year: u32) -> f64 {
        match self {
            AnnualizedRate::PerSecond(r) => r * f64::from(seconds_per_year),
            AnnualizedRate::Annual(r) => r,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum RateError {
    #[error("annualized rate {0} exceeds sanity cap of {MAX_SANE_ANNUAL_RATE} (1000%)")]
    ExceedsSanityCap(f64),
}

// ── Annualization ────────────────────────────────────────────────────

/// Convert a rate into an annual percentage yield via per-second
/// discrete compounding:
///
///   APY = (1 + r/n)^n - 1,   n = seconds_per_year, r = annual rate
///
/// A non-positive rate yields APY 0 with no error (no yield is valid,
/// not a failure). A rate annualizing above [`MAX_SANE_ANNUAL_RATE`]
/// is rejected as corrupted input. Pathological float results (negative
/// from rounding, NaN, infinity) clamp to 0 — never propagated.
pub fn annualize(rate: AnnualizedRate, seconds_per_year: u32) -> Result<f64, RateError> {
    let annual = rate.annual(seconds_per_year);

    if annual <= 0.0 {
        return Ok(0.0);
    }
    if annual > MAX_SANE_ANNUAL_RATE {
        return Err(RateError::ExceedsSanityCap(annual));
    }

    let n = f64::from(seconds_per_year);
    let per_second = annual / n;

    // (1 + r)^n = exp(n * ln(1 + r)); exp_m1/ln_1p keep precision for
    // per-second rates on the order of 1e-9 compounded ~31.5M times.
    let apy = f64::exp_m1(n * f64::ln_1p(per_second));

    if !apy.is_finite() || apy < 0.0 {
        return Ok(0.0);
    }
    Ok(apy)
}

// ── Fixed-point normalization ────────────────────────────────────────

/// Lossy (f64) value of a U256. Exact for values below 2^53; beyond
/// that the result carries ordinary f64 rounding, which is all the APY
/// math needs.
fn u256_to_f64(v: U256) -> f64 {
    v.as_limbs()
        .iter()
        .enumerate()
        .map(|(i, &limb)| (limb as f64) * 2f64.powi(64 * i as i32))
        .sum()
}

/// RAY-scaled annual rate → plain decimal ratio.
pub fn ray_to_ratio(rate: U256) -> f64 {
    u256_to_f64(rate) / RAY
}

/// WAD-scaled per-second rate → plain decimal ratio.
pub fn wad_per_second_to_ratio(rate: u64) -> f64 {
    rate as f64 / WAD
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-12;

    fn relative_eq(a: f64, b: f64, tol: f64) -> bool {
        if b == 0.0 {
            return a.abs() < tol;
        }
        ((a - b) / b).abs() < tol
    }

    #[test]
    fn zero_and_negative_rates_yield_exactly_zero() {
        assert_eq!(
            annualize(AnnualizedRate::Annual(0.0), SECONDS_PER_YEAR),
            Ok(0.0)
        );
        assert_eq!(
            annualize(AnnualizedRate::Annual(-0.05), SECONDS_PER_YEAR),
            Ok(0.0)
        );
        assert_eq!(
            annualize(AnnualizedRate::PerSecond(-1e-9), SECONDS_PER_YEAR),
            Ok(0.0)
        );
    }

    #[test]
    fn matches_high_precision_reference() {
        // (1 + r/n)^n - 1 for n = 31_536_000, evaluated in 60-digit
        // arbitrary-precision arithmetic and rounded to f64.
        let cases = [
            (0.01, 0.010050167082566633508),
            (0.05, 0.051271096334354555012),
            (0.10, 0.10517091790042392560),
            (0.50, 0.64872126416505216224),
            (2.0, 6.3890556303198211926),
        ];
        for (apr, expected) in cases {
            let got = annualize(AnnualizedRate::Annual(apr), SECONDS_PER_YEAR).unwrap();
            assert!(
                relative_eq(got, expected, TOL),
                "apr={apr}: got {got}, expected {expected}"
            );
        }
    }

    #[test]
    fn per_second_and_annual_forms_agree() {
        let apr = 0.0523;
        let per_second = apr / f64::from(SECONDS_PER_YEAR);
        let a = annualize(AnnualizedRate::Annual(apr), SECONDS_PER_YEAR).unwrap();
        let b = annualize(AnnualizedRate::PerSecond(per_second), SECONDS_PER_YEAR).unwrap();
        assert!(relative_eq(a, b, TOL), "{a} vs {b}");
    }

    #[test]
    fn apy_exceeds_apr_for_positive_rates() {
        let apr = 0.05;
        let apy = annualize(AnnualizedRate::Annual(apr), SECONDS_PER_YEAR).unwrap();
        // Continuous-ish compounding of 5% lands near e^0.05 - 1.
        assert!(apy > apr);
        assert!(relative_eq(apy, f64::exp_m1(apr), 1e-4), "{apy}");
    }

    #[test]
    fn monotonic_in_rate() {
        let rates: Vec<f64> = (1..100).map(|i| i as f64 * 0.05).collect();
        let mut prev = 0.0;
        for apr in rates {
            if apr > MAX_SANE_ANNUAL_RATE {
                break;
            }
            let apy = annualize(AnnualizedRate::Annual(apr), SECONDS_PER_YEAR).unwrap();
            assert!(apy >= prev, "apr={apr}: {apy} < {prev}");
            prev = apy;
        }
    }

    #[test]
    fn sanity_cap_rejects_corrupted_rates() {
        let err = annualize(AnnualizedRate::Annual(10.5), SECONDS_PER_YEAR).unwrap_err();
        assert_eq!(err, RateError::ExceedsSanityCap(10.5));

        // Per-second form is normalized before the cap applies.
        let per_second = 11.0 / f64::from(SECONDS_PER_YEAR);
        assert!(annualize(AnnualizedRate::PerSecond(per_second), SECONDS_PER_YEAR).is_err());

        // Exactly at the cap is still accepted.
        assert!(annualize(AnnualizedRate::Annual(10.0), SECONDS_PER_YEAR).is_ok());
    }

    #[test]
    fn tiny_per_second_rates_keep_precision() {
        // 1 wei-ish per-second rate: naive (1+r)^n would collapse to 0.
        // Reference (1 + 1e-15)^n - 1 from 60-digit arithmetic.
        let apy = annualize(AnnualizedRate::PerSecond(1e-15), SECONDS_PER_YEAR).unwrap();
        assert!(relative_eq(apy, 3.1536000497259637459e-8, TOL), "{apy}");
    }

    #[test]
    fn ray_conversion() {
        // 5% APR in RAY = 0.05 * 1e27
        let ray = U256::from(5u64) * U256::from(10u64).pow(U256::from(25u64));
        assert!(relative_eq(ray_to_ratio(ray), 0.05, TOL));
        assert_eq!(ray_to_ratio(U256::ZERO), 0.0);
    }

    #[test]
    fn wad_conversion() {
        // 1585489599 per-second WAD ≈ 5% APR
        let per_second = wad_per_second_to_ratio(1_585_489_599);
        let apr = per_second * f64::from(SECONDS_PER_YEAR);
        assert!(relative_eq(apr, 0.05, 1e-6), "{apr}");
    }
}
