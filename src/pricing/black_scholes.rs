//! Black-Scholes Model
//!
//! Closed-form European option value and first-order sensitivities under a
//! single-factor lognormal diffusion. Time is measured in days and converted
//! with a 365-day year.
//!
//! Sensitivities are per unit: theta per year, vega per 1.00 of volatility,
//! rho per 1.00 of rate. Scaling to dollars or per-day figures happens at
//! display time.

use statrs::distribution::{Continuous, ContinuousCDF, Normal};

use crate::error::{CondorError, CondorResult};
use crate::types::{Greeks, OptionKind, OptionQuote};

pub const DAYS_PER_YEAR: f64 = 365.0;

/// Smallest volatility callers should pass when flooring a quoted IV.
pub const MIN_VOLATILITY: f64 = 1e-4;

fn standard_normal() -> CondorResult<Normal> {
    Normal::new(0.0, 1.0)
        .map_err(|e| CondorError::invalid_input(format!("standard normal: {e}")))
}

/// Standard normal CDF
pub fn norm_cdf(x: f64) -> f64 {
    standard_normal().map_or(f64::NAN, |n| n.cdf(x))
}

/// Standard normal PDF
pub fn norm_pdf(x: f64) -> f64 {
    standard_normal().map_or(f64::NAN, |n| n.pdf(x))
}

fn d1(spot: f64, strike: f64, rate: f64, vol: f64, time: f64) -> f64 {
    ((spot / strike).ln() + (rate + 0.5 * vol * vol) * time) / (vol * time.sqrt())
}

fn validate(
    spot: f64,
    strike: f64,
    volatility: f64,
    rate: f64,
) -> CondorResult<()> {
    if !spot.is_finite() || spot <= 0.0 {
        return Err(CondorError::invalid_input(format!("spot must be > 0, got {spot}")));
    }
    if !strike.is_finite() || strike <= 0.0 {
        return Err(CondorError::invalid_input(format!("strike must be > 0, got {strike}")));
    }
    if !volatility.is_finite() || volatility <= 0.0 {
        return Err(CondorError::invalid_input(format!(
            "volatility must be > 0, got {volatility}"
        )));
    }
    if !rate.is_finite() || rate < 0.0 {
        return Err(CondorError::invalid_input(format!("rate must be >= 0, got {rate}")));
    }
    Ok(())
}

/// Value and sensitivities of one option.
///
/// At zero days to expiry the price is the intrinsic value, delta is the
/// in-the-money indicator and every other sensitivity is zero.
pub fn price_and_sensitivities(
    spot: f64,
    strike: f64,
    days_to_expiry: u32,
    volatility: f64,
    rate: f64,
    kind: OptionKind,
) -> CondorResult<OptionQuote> {
    validate(spot, strike, volatility, rate)?;

    let (price, greeks) = if days_to_expiry == 0 {
        let delta = match kind {
            OptionKind::Call => {
                if spot > strike {
                    1.0
                } else {
                    0.0
                }
            }
            OptionKind::Put => {
                if spot < strike {
                    -1.0
                } else {
                    0.0
                }
            }
        };
        (kind.intrinsic(spot, strike), Greeks::new(delta, 0.0, 0.0, 0.0, 0.0))
    } else {
        let time = f64::from(days_to_expiry) / DAYS_PER_YEAR;
        let sqrt_t = time.sqrt();
        let d1 = d1(spot, strike, rate, volatility, time);
        let d2 = d1 - volatility * sqrt_t;
        let df = (-rate * time).exp();
        let normal = standard_normal()?;
        let pdf_d1 = normal.pdf(d1);

        let gamma = pdf_d1 / (spot * volatility * sqrt_t);
        let vega = spot * pdf_d1 * sqrt_t;
        let decay = -spot * pdf_d1 * volatility / (2.0 * sqrt_t);

        match kind {
            OptionKind::Call => {
                let nd1 = normal.cdf(d1);
                let nd2 = normal.cdf(d2);
                let price = spot * nd1 - strike * df * nd2;
                let theta = decay - rate * strike * df * nd2;
                let rho = strike * time * df * nd2;
                (price, Greeks::new(nd1, gamma, theta, vega, rho))
            }
            OptionKind::Put => {
                let n_neg_d1 = normal.cdf(-d1);
                let n_neg_d2 = normal.cdf(-d2);
                let price = strike * df * n_neg_d2 - spot * n_neg_d1;
                let theta = decay + rate * strike * df * n_neg_d2;
                let rho = -strike * time * df * n_neg_d2;
                (price, Greeks::new(-n_neg_d1, gamma, theta, vega, rho))
            }
        }
    };

    let greeks = Greeks {
        delta: match kind {
            OptionKind::Call => greeks.delta.clamp(0.0, 1.0),
            OptionKind::Put => greeks.delta.clamp(-1.0, 0.0),
        },
        gamma: greeks.gamma.max(0.0),
        vega: greeks.vega.max(0.0),
        ..greeks
    };

    if !price.is_finite()
        || [greeks.delta, greeks.gamma, greeks.theta, greeks.vega, greeks.rho]
            .iter()
            .any(|g| !g.is_finite())
    {
        return Err(CondorError::invalid_input(format!(
            "pricing {kind} {strike} produced a non-finite result"
        )));
    }

    let price = price.max(0.0);
    Ok(OptionQuote {
        strike,
        kind,
        days_to_expiry,
        bid: price,
        ask: price,
        last: price,
        implied_volatility: volatility,
        greeks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_norm_cdf() {
        assert!((norm_cdf(0.0) - 0.5).abs() < 1e-10);
        assert!((norm_cdf(1.96) - 0.975).abs() < 0.001);
        assert!((norm_cdf(-1.96) - 0.025).abs() < 0.001);
    }

    #[test]
    fn test_norm_pdf() {
        assert!((norm_pdf(0.0) - 0.398_942_280_4).abs() < 1e-9);
        assert!((norm_pdf(1.0) - 0.241_970_724_5).abs() < 1e-9);
        assert!((norm_pdf(-1.0) - norm_pdf(1.0)).abs() < 1e-15);
    }

    #[test]
    fn test_bs_price_and_parity() {
        // ATM, 20% vol, one year, 5% rate: textbook call value is about 10.45
        let call = price_and_sensitivities(100.0, 100.0, 365, 0.20, 0.05, OptionKind::Call).unwrap();
        let put = price_and_sensitivities(100.0, 100.0, 365, 0.20, 0.05, OptionKind::Put).unwrap();
        assert!((call.last - 10.45).abs() < 0.01);

        let parity = call.last - put.last - (100.0 - 100.0 * (-0.05_f64).exp());
        assert!(parity.abs() < 1e-9);
    }

    #[test]
    fn test_greeks_signs() {
        let call = price_and_sensitivities(100.0, 100.0, 365, 0.20, 0.05, OptionKind::Call).unwrap();
        assert!(call.greeks.delta > 0.5 && call.greeks.delta < 0.7);
        assert!(call.greeks.gamma > 0.0);
        assert!(call.greeks.theta < 0.0);
        assert!(call.greeks.vega > 0.0);
        assert!(call.greeks.rho > 0.0);

        let put = price_and_sensitivities(100.0, 100.0, 365, 0.20, 0.05, OptionKind::Put).unwrap();
        assert!(put.greeks.rho < 0.0);
        assert!((put.greeks.vega - call.greeks.vega).abs() < 1e-12);
        assert!((put.greeks.gamma - call.greeks.gamma).abs() < 1e-12);
    }

    #[test]
    fn expiry_day_is_intrinsic() {
        let call = price_and_sensitivities(105.0, 100.0, 0, 0.25, 0.045, OptionKind::Call).unwrap();
        assert_eq!(call.last, 5.0);
        assert_eq!(call.greeks, Greeks::new(1.0, 0.0, 0.0, 0.0, 0.0));

        let put = price_and_sensitivities(105.0, 100.0, 0, 0.25, 0.045, OptionKind::Put).unwrap();
        assert_eq!(put.last, 0.0);
        assert_eq!(put.greeks, Greeks::new(0.0, 0.0, 0.0, 0.0, 0.0));

        let itm_put = price_and_sensitivities(95.0, 100.0, 0, 0.25, 0.045, OptionKind::Put).unwrap();
        assert_eq!(itm_put.last, 5.0);
        assert_eq!(itm_put.greeks.delta, -1.0);
    }

    #[test]
    fn rejects_degenerate_inputs() {
        for (spot, strike, vol, rate) in [
            (0.0, 100.0, 0.2, 0.01),
            (100.0, -1.0, 0.2, 0.01),
            (100.0, 100.0, 0.0, 0.01),
            (100.0, 100.0, f64::NAN, 0.01),
            (100.0, 100.0, 0.2, -0.01),
        ] {
            let result = price_and_sensitivities(spot, strike, 30, vol, rate, OptionKind::Call);
            assert!(matches!(result, Err(CondorError::InvalidInput(_))));
        }
    }

    proptest! {
        #[test]
        fn delta_bounds_and_parity(
            spot in 50.0..500.0f64,
            moneyness in 0.7..1.3f64,
            days in 1u32..400,
            vol in 0.05..1.5f64,
            rate in 0.0..0.10f64,
        ) {
            let strike = spot * moneyness;
            let call = price_and_sensitivities(spot, strike, days, vol, rate, OptionKind::Call).unwrap();
            let put = price_and_sensitivities(spot, strike, days, vol, rate, OptionKind::Put).unwrap();

            prop_assert!((0.0..=1.0).contains(&call.greeks.delta));
            prop_assert!((-1.0..=0.0).contains(&put.greeks.delta));
            prop_assert!((call.greeks.delta - put.greeks.delta - 1.0).abs() < 1e-9);
            prop_assert!(call.greeks.gamma >= 0.0);
            prop_assert!(call.greeks.vega >= 0.0 && put.greeks.vega >= 0.0);
            prop_assert!(call.last >= 0.0 && put.last >= 0.0);
        }
    }
}
