//! Core orchestration for the check-in system.
//!
//! A run selects one RPC endpoint, then walks the configured targets in
//! priority order: probe for claimability, submit, and wait for the receipt.
//! The first confirmed success ends the run. Everything the run touches on
//! chain goes through the delivery and account seams, so the whole flow can
//! be driven by mocks in tests.

pub mod builder;
pub mod engine;
pub mod monitoring;
pub mod prober;
pub mod submitter;

pub use builder::{BuilderError, CheckinBuilder, CheckinFactories};
pub use engine::{CheckinEngine, RunState};
pub use monitoring::{ConfirmationOutcome, ConfirmationPoller};
pub use prober::{ClaimabilityProber, ProbeOutcome};
pub use submitter::{SubmitError, TransactionSubmitter};
