//! Monitoring of broadcast transactions.

pub mod confirmation;

pub use confirmation::{ConfirmationOutcome, ConfirmationPoller};
