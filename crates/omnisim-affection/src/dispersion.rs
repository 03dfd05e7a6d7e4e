//! Dispersion functions.
//!
//! A dispersion maps normalized proximity `x = 1 - d / range` (1 at the
//! source, 0 at the edge of its range) to an attenuation weight.
//!
//! | Kind | `f(x)` |
//! |---|---|
//! | `Constant` | `x + value` |
//! | `Linear` | `start + step · x` |
//! | `Quadratic` | `a · x² + b · x + c` |
//! | `Exponential` | `y_intercept + base^x` |
//! | `Logarithmic` | `alpha · log_base(x + 1)` |

use omnisim_types::{DispersionSpec, SimError};

/// Evaluate `spec` at `x`.
pub fn apply(spec: &DispersionSpec, x: f64) -> f64 {
    match *spec {
        DispersionSpec::Constant { value } => x + value,
        DispersionSpec::Linear { start, step } => start + step * x,
        DispersionSpec::Quadratic { a, b, c } => a * x * x + b * x + c,
        DispersionSpec::Exponential { base, y_intercept } => y_intercept + base.powf(x),
        DispersionSpec::Logarithmic { base, alpha } => alpha * (x + 1.0).log(base),
    }
}

/// Reject parameter sets that cannot produce finite weights.
///
/// # Errors
///
/// [`SimError::InvalidConfiguration`] for non-finite parameters or a
/// logarithm base that is not positive or equals 1.
pub fn validate(spec: &DispersionSpec) -> Result<(), SimError> {
    let params = match spec {
        DispersionSpec::Constant { value } => vec![*value],
        DispersionSpec::Linear { start, step } => vec![*start, *step],
        DispersionSpec::Quadratic { a, b, c } => vec![*a, *b, *c],
        DispersionSpec::Exponential { base, y_intercept } => vec![*base, *y_intercept],
        DispersionSpec::Logarithmic { base, alpha } => vec![*base, *alpha],
    };
    if params.iter().any(|p| !p.is_finite()) {
        return Err(SimError::InvalidConfiguration(format!(
            "dispersion {spec:?} has non-finite parameters"
        )));
    }
    if let DispersionSpec::Logarithmic { base, .. } = spec
        && (*base <= 0.0 || *base == 1.0)
    {
        return Err(SimError::InvalidConfiguration(format!(
            "logarithmic dispersion base {base} must be positive and != 1"
        )));
    }
    Ok(())
}
