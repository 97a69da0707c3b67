//! Optional observability helpers for strategy operations.
//!
//! # Feature Flags
//!
//! - `tracing`: every operation runs inside an `oauth2_oschina.flow` span (`flow`, `stage`,
//!   `outcome`); failures are logged at `WARN`.
//! - `metrics`: `oauth2_oschina_flow_total{flow, outcome}` counts attempts and results, and
//!   `oauth2_oschina_flow_duration_seconds{flow}` records how long each operation took.

mod metrics;
mod span;

pub use metrics::*;
pub use span::*;

// std
use std::time::Instant;
// self
use crate::_prelude::*;

/// Strategy operations observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// Full callback handling (exchange, profile, verify).
	Authenticate,
	/// Authorization code for token exchange.
	TokenExchange,
	/// User-info request and normalization.
	UserProfile,
}
impl FlowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::Authenticate => "authenticate",
			FlowKind::TokenExchange => "token_exchange",
			FlowKind::UserProfile => "user_profile",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Entry to a strategy operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
		}
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Runs `fut` inside a [`FlowSpan`], recording the attempt, its outcome, and its duration.
pub(crate) async fn observe<T, Fut>(kind: FlowKind, stage: &'static str, fut: Fut) -> Result<T>
where
	Fut: Future<Output = Result<T>>,
{
	let span = FlowSpan::new(kind, stage);
	let started = Instant::now();

	record_flow_outcome(kind, FlowOutcome::Attempt);

	let result = span.instrument(fut).await;
	let outcome = if result.is_ok() { FlowOutcome::Success } else { FlowOutcome::Failure };

	span.settle(outcome, result.as_ref().err());
	record_flow_outcome(kind, outcome);
	record_flow_duration(kind, started.elapsed());

	result
}
