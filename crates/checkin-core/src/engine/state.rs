//! States of a check-in run.

use std::fmt;

/// Where a run currently is.
///
/// A run moves `SelectingEndpoint -> ProbingTarget -> Submitting -> Polling`
/// and then either `Succeeded` or `Advancing` back to the next target's
/// probe. Every path ends in `Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
	LoadingAccount,
	SelectingEndpoint,
	ProbingTarget,
	Submitting,
	Polling,
	Advancing,
	Succeeded,
	Aborted,
	Done,
}

impl RunState {
	/// States after which no further target is attempted.
	pub fn is_terminal(&self) -> bool {
		matches!(self, RunState::Succeeded | RunState::Aborted | RunState::Done)
	}
}

impl fmt::Display for RunState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			RunState::LoadingAccount => "LoadingAccount",
			RunState::SelectingEndpoint => "SelectingEndpoint",
			RunState::ProbingTarget => "ProbingTarget",
			RunState::Submitting => "Submitting",
			RunState::Polling => "Polling",
			RunState::Advancing => "Advancing",
			RunState::Succeeded => "Succeeded",
			RunState::Aborted => "Aborted",
			RunState::Done => "Done",
		};
		write!(f, "{}", name)
	}
}
