//! Application hook that turns tokens plus a normalized profile into an authenticated user.

// self
use crate::{_prelude::*, auth::TokenSet, profile::Profile};

/// Outcome of a completed callback.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verified<U> {
	/// Application accepted the login.
	User(U),
	/// Login was refused without an error: state mismatch, user denial, or the verify hook
	/// declined the account.
	Rejected {
		/// Human-readable reason, when one is available.
		message: Option<String>,
	},
}
impl<U> Verified<U> {
	/// Rejection carrying `message`.
	pub fn rejected(message: impl Into<String>) -> Self {
		Self::Rejected { message: Some(message.into()) }
	}

	/// Returns true when a user was produced.
	pub fn is_user(&self) -> bool {
		matches!(self, Self::User(_))
	}

	/// Extracts the user, discarding rejection details.
	pub fn into_user(self) -> Option<U> {
		match self {
			Self::User(user) => Some(user),
			Self::Rejected { .. } => None,
		}
	}
}

/// Verify hook invoked once tokens and profile are available.
///
/// Implemented for any `Fn(TokenSet, Profile) -> impl Future<Output = Result<Verified<U>>>`, so
/// an `async` closure or a plain function returning an `async` block is enough. Failures should be
/// wrapped with [`Error::verify`].
pub trait Verify
where
	Self: Send + Sync,
{
	/// User type produced on success.
	type User: Send;

	/// Decides whether the login identified by `tokens` and `profile` is accepted.
	fn verify(
		&self,
		tokens: TokenSet,
		profile: Profile,
	) -> impl Future<Output = Result<Verified<Self::User>>> + Send;
}
impl<F, Fut, U> Verify for F
where
	F: Send + Sync + Fn(TokenSet, Profile) -> Fut,
	Fut: Send + Future<Output = Result<Verified<U>>>,
	U: Send,
{
	type User = U;

	fn verify(
		&self,
		tokens: TokenSet,
		profile: Profile,
	) -> impl Future<Output = Result<Verified<Self::User>>> + Send {
		self(tokens, profile)
	}
}
