//! Final outcome of an orchestrator run.

use crate::TransactionHash;
use std::fmt;

/// Why a run was aborted before reaching a terminal target outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortReason {
	/// No signing key was configured.
	MissingCredentials,
	/// The configured signing key could not be loaded.
	InvalidCredentials(String),
	/// None of the configured endpoints answered the liveness check.
	NoReachableEndpoint,
	/// Signing a transaction failed.
	SigningFailed(String),
	/// The run could not be assembled from its configuration.
	Configuration(String),
}

impl fmt::Display for AbortReason {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			AbortReason::MissingCredentials => write!(f, "missing private key"),
			AbortReason::InvalidCredentials(e) => write!(f, "invalid private key: {}", e),
			AbortReason::NoReachableEndpoint => write!(f, "no RPC endpoint reachable"),
			AbortReason::SigningFailed(e) => write!(f, "signing failed: {}", e),
			AbortReason::Configuration(e) => write!(f, "configuration error: {}", e),
		}
	}
}

/// The single terminal result of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
	/// A target's transaction was confirmed successfully; no later target was attempted.
	Succeeded {
		target: String,
		tx_hash: TransactionHash,
	},
	/// Every target was attempted and none produced a successful transaction.
	NoneClaimable,
	/// A fatal error stopped the run.
	Aborted(AbortReason),
}

impl RunOutcome {
	pub fn is_success(&self) -> bool {
		matches!(self, RunOutcome::Succeeded { .. })
	}

	pub fn is_aborted(&self) -> bool {
		matches!(self, RunOutcome::Aborted(_))
	}
}

impl fmt::Display for RunOutcome {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			RunOutcome::Succeeded { target, tx_hash } => {
				write!(f, "[OK] Checked in at {} (tx {})", target, tx_hash)
			}
			RunOutcome::NoneClaimable => write!(f, "[DONE] No target claimable today"),
			RunOutcome::Aborted(reason) => write!(f, "[ERROR] Run aborted: {}", reason),
		}
	}
}
