//! Gas limit scaling applied on top of a node's gas estimate.

use std::fmt;
use thiserror::Error;

/// Fixed-point scale for multipliers: four decimal digits.
const SCALE: u128 = 10_000;

/// Errors that can occur when constructing a gas multiplier.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GasMultiplierError {
	#[error("Gas multiplier must be a finite number, got {0}")]
	NotFinite(f64),
	#[error("Gas multiplier must be at least 1.0, got {0}")]
	BelowOne(f64),
	#[error("Gas multiplier must have at most four decimal places, got {0}")]
	TooPrecise(f64),
}

/// Safety multiplier applied to a gas estimate to obtain the gas limit.
///
/// The value is kept in basis points so that the scaled limit is computed
/// with integer arithmetic: `apply(estimate) == ceil(estimate * multiplier)`
/// for any multiplier expressed with up to four decimal digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasMultiplier {
	basis_points: u128,
}

impl GasMultiplier {
	/// Multiplier used when none is configured.
	pub const DEFAULT: GasMultiplier = GasMultiplier { basis_points: 12_000 };

	/// Creates a multiplier, rejecting values below 1.0, non-finite input and
	/// values finer than four decimal places.
	pub fn new(value: f64) -> Result<Self, GasMultiplierError> {
		if !value.is_finite() {
			return Err(GasMultiplierError::NotFinite(value));
		}
		if value < 1.0 {
			return Err(GasMultiplierError::BelowOne(value));
		}

		let scaled = value * SCALE as f64;
		// Tolerates float representation error only, e.g. 1.1 * 10_000
		if (scaled - scaled.round()).abs() > 1e-6 * scaled {
			return Err(GasMultiplierError::TooPrecise(value));
		}

		Ok(Self {
			basis_points: scaled.round() as u128,
		})
	}

	/// Scales a gas estimate, rounding up.
	pub fn apply(&self, estimate: u64) -> u64 {
		(estimate as u128)
			.checked_mul(self.basis_points)
			.map(|product| product.div_ceil(SCALE))
			.and_then(|scaled| u64::try_from(scaled).ok())
			.unwrap_or(u64::MAX)
	}

	/// Returns the multiplier as a float, for display.
	pub fn as_f64(&self) -> f64 {
		self.basis_points as f64 / SCALE as f64
	}
}

impl Default for GasMultiplier {
	fn default() -> Self {
		Self::DEFAULT
	}
}

impl fmt::Display for GasMultiplier {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.as_f64())
	}
}
