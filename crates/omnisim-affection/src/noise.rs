//! Noise models applied to sensed values.
//!
//! Randomness comes from the caller's RNG so that a run seeded with the same
//! seed reproduces the same readings.

use omnisim_types::{NoiseSpec, SimError};
use rand::Rng;
use rand_distr::{Distribution, Normal};
use tracing::{debug, warn};

/// Perturb `value` according to `spec`.  `t` is simulation time in seconds
/// (used by periodic custom noise).
pub fn apply<R: Rng>(spec: &NoiseSpec, value: f64, t: f64, rng: &mut R) -> f64 {
    match spec {
        NoiseSpec::Gaussian { mean, std } => match Normal::new(*mean, *std) {
            Ok(normal) => value + normal.sample(rng),
            Err(e) => {
                warn!(mean, std, error = %e, "unusable gaussian noise, value unchanged");
                value
            }
        },
        NoiseSpec::Uniform { min, max } => {
            if min < max {
                value + rng.random_range(*min..=*max)
            } else {
                value + min
            }
        }
        NoiseSpec::Custom { subtype, params } => {
            let param = |key: &str| params.get(key).copied().unwrap_or(0.0);
            match subtype.as_str() {
                "sine" => value + param("amplitude") * (param("frequency") * t).sin(),
                "step" => {
                    let step = param("step");
                    if rng.random_bool(0.5) {
                        value + step
                    } else {
                        value - step
                    }
                }
                other => {
                    debug!(subtype = other, "unknown custom noise, value unchanged");
                    value
                }
            }
        }
    }
}

/// # Errors
///
/// [`SimError::InvalidConfiguration`] for negative `std`, `min > max`, or
/// non-finite parameters.
pub fn validate(spec: &NoiseSpec) -> Result<(), SimError> {
    let bad = |msg: String| Err(SimError::InvalidConfiguration(msg));
    match spec {
        NoiseSpec::Gaussian { mean, std } => {
            if !mean.is_finite() {
                return bad(format!("gaussian noise mean {mean} is not finite"));
            }
            Normal::new(*mean, *std).map_err(|e| {
                SimError::InvalidConfiguration(format!(
                    "gaussian noise N({mean}, {std}) is invalid: {e}"
                ))
            })?;
        }
        NoiseSpec::Uniform { min, max } => {
            if !min.is_finite() || !max.is_finite() || min > max {
                return bad(format!(
                    "uniform noise needs finite min <= max, got [{min}, {max}]"
                ));
            }
        }
        NoiseSpec::Custom { subtype, params } => {
            if let Some((k, v)) = params.iter().find(|(_, v)| !v.is_finite()) {
                return bad(format!(
                    "custom noise '{subtype}' parameter {k} = {v} is not finite"
                ));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    fn custom(subtype: &str, params: &[(&str, f64)]) -> NoiseSpec {
        NoiseSpec::Custom {
            subtype: subtype.to_string(),
            params: params
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    #[test]
    fn zero_std_gaussian_is_mean_shift() {
        let spec = NoiseSpec::Gaussian {
            mean: 1.5,
            std: 0.0,
        };
        assert_eq!(apply(&spec, 10.0, 0.0, &mut rng()), 11.5);
    }

    #[test]
    fn gaussian_sample_mean_is_close() {
        let spec = NoiseSpec::Gaussian {
            mean: 0.0,
            std: 1.0,
        };
        let mut r = rng();
        let n = 5_000;
        let total: f64 = (0..n).map(|_| apply(&spec, 0.0, 0.0, &mut r)).sum();
        assert!((total / f64::from(n)).abs() < 0.1);
    }

    #[test]
    fn uniform_stays_in_bounds() {
        let spec = NoiseSpec::Uniform {
            min: -1.0,
            max: 2.0,
        };
        let mut r = rng();
        for _ in 0..1_000 {
            let v = apply(&spec, 5.0, 0.0, &mut r);
            assert!((4.0..=7.0).contains(&v));
        }
    }

    #[test]
    fn sine_follows_time() {
        let spec = custom("sine", &[("amplitude", 2.0), ("frequency", 1.0)]);
        let v = apply(&spec, 10.0, std::f64::consts::FRAC_PI_2, &mut rng());
        assert!((v - 12.0).abs() < 1e-12);
    }

    #[test]
    fn step_moves_by_exactly_step() {
        let spec = custom("step", &[("step", 0.5)]);
        let mut r = rng();
        for _ in 0..50 {
            let v = apply(&spec, 3.0, 0.0, &mut r);
            assert!(v == 3.5 || v == 2.5);
        }
    }

    #[test]
    fn unknown_custom_is_identity() {
        let spec = custom("wobble", &[("k", 3.0)]);
        assert_eq!(apply(&spec, 42.0, 1.0, &mut rng()), 42.0);
        assert!(validate(&spec).is_ok());
    }

    #[test]
    fn same_seed_same_sequence() {
        let spec = NoiseSpec::Gaussian {
            mean: 0.0,
            std: 3.0,
        };
        let a = apply(&spec, 0.0, 0.0, &mut rng());
        let b = apply(&spec, 0.0, 0.0, &mut rng());
        assert_eq!(a, b);
    }

    #[test]
    fn gaussian_spread_matches_std() {
        let spec = NoiseSpec::Gaussian {
            mean: 2.0,
            std: 0.5,
        };
        let mut r = rng();
        let samples: Vec<f64> = (0..5_000).map(|_| apply(&spec, 0.0, 0.0, &mut r)).collect();
        let n = samples.len() as f64;
        let mean = samples.iter().sum::<f64>() / n;
        let var = samples.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        assert!((mean - 2.0).abs() < 0.05);
        assert!((var.sqrt() - 0.5).abs() < 0.05);
    }

    #[test]
    fn invalid_gaussian_leaves_value() {
        let spec = NoiseSpec::Gaussian {
            mean: 0.0,
            std: f64::NAN,
        };
        assert_eq!(apply(&spec, 4.0, 0.0, &mut rng()), 4.0);
        assert!(matches!(
            validate(&spec),
            Err(SimError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn validation_rules() {
        assert!(
            validate(&NoiseSpec::Gaussian {
                mean: 0.0,
                std: -1.0
            })
            .is_err()
        );
        assert!(
            validate(&NoiseSpec::Uniform {
                min: 2.0,
                max: 1.0
            })
            .is_err()
        );
        assert!(validate(&custom("sine", &[("amplitude", f64::INFINITY)])).is_err());
        assert!(
            validate(&NoiseSpec::Uniform {
                min: 1.0,
                max: 1.0
            })
            .is_ok()
        );
    }
}
