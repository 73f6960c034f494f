//! Claimability probing.
//!
//! A target is claimable when a gas estimate for its call succeeds. The node
//! simulates the call, so a closed check-in window or an already claimed day
//! shows up as a failed estimate without spending gas.

use checkin_delivery::{DeliveryError, DeliveryInterface};
use checkin_types::{Address, CallRequest, Target, U256};

/// Result of probing one target.
#[derive(Debug)]
pub enum ProbeOutcome {
	/// The call would currently execute.
	Claimable { gas_estimate: u64 },
	/// The simulated call failed; the reason is kept for logs only.
	NotClaimable { reason: String },
	/// The probe could not be made, e.g. the endpoint dropped the request.
	Error(DeliveryError),
}

impl ProbeOutcome {
	pub fn is_claimable(&self) -> bool {
		matches!(self, ProbeOutcome::Claimable { .. })
	}
}

/// Dry-runs target calls through gas estimation.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClaimabilityProber;

impl ClaimabilityProber {
	pub fn new() -> Self {
		Self
	}

	/// Estimates gas for the target's call from `sender` without broadcasting.
	pub async fn probe(
		&self,
		client: &dyn DeliveryInterface,
		sender: Address,
		target: &Target,
	) -> ProbeOutcome {
		let call = CallRequest {
			from: sender,
			to: target.address,
			data: target.calldata.clone(),
			value: U256::ZERO,
		};

		match client.estimate_gas(&call).await {
			Ok(gas_estimate) => ProbeOutcome::Claimable { gas_estimate },
			Err(DeliveryError::Reverted(reason)) => ProbeOutcome::NotClaimable { reason },
			Err(e) => ProbeOutcome::Error(e),
		}
	}
}
