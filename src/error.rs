//! Strategy-level error types shared by the OAuth client, profile fetch, and callback handling.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Boxed error used for transport and application failures of unknown concrete type.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical strategy error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Temporary token endpoint failure; retry with backoff.
	#[error(transparent)]
	Transient(#[from] TransientError),
	/// Communication with the provider failed.
	#[error("{context}.")]
	Upstream {
		/// Operation that was talking to the provider.
		context: &'static str,
		/// Underlying failure.
		#[source]
		source: UpstreamError,
	},
	/// User profile response body is not valid JSON.
	#[error("Failed to parse user profile.")]
	ProfileParse {
		/// Decoding failure reported by `serde_json`.
		#[source]
		source: serde_json::Error,
	},

	/// Authorization server reported an error on the callback redirect.
	#[error("Authorization server returned `{code}`.")]
	Authorization {
		/// OAuth `error` code.
		code: String,
		/// OAuth `error_description`, when supplied.
		description: Option<String>,
		/// OAuth `error_uri`, when supplied.
		uri: Option<String>,
	},
	/// Callback carried neither an error nor an authorization code.
	#[error("Callback is missing the authorization code.")]
	InvalidCallback,
	/// Requested scopes exceed what was granted.
	#[error("Token lacks the required scopes: {reason}.")]
	InsufficientScope {
		/// Provider-supplied reason string.
		reason: String,
	},
	/// Provider rejected the grant (e.g., bad or reused code).
	#[error("Provider rejected the grant: {reason}.")]
	InvalidGrant {
		/// Provider-supplied reason string.
		reason: String,
	},
	/// Client authentication failed or credentials are malformed.
	#[error("Client authentication failed: {reason}.")]
	InvalidClient {
		/// Provider-supplied reason string.
		reason: String,
	},
	/// Application verify callback failed.
	#[error("Verify callback failed.")]
	Verify(#[source] BoxError),
}
impl Error {
	/// Wraps an upstream failure with the operation it interrupted.
	pub fn upstream(context: &'static str, source: impl Into<UpstreamError>) -> Self {
		Self::Upstream { context, source: source.into() }
	}

	/// Wraps an application error raised from a verify callback.
	pub fn verify(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Verify(Box::new(src))
	}
}

/// Configuration and validation failures raised while building a strategy.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Client identifier is empty.
	#[error("OAuth client requires a client ID.")]
	MissingClientId,
	/// Client secret is empty.
	#[error("OAuth client requires a client secret.")]
	MissingClientSecret,
	/// Endpoint URL cannot be parsed.
	#[error("The {endpoint} endpoint URL is invalid.")]
	InvalidEndpoint {
		/// Which endpoint failed to parse.
		endpoint: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Endpoint uses a scheme other than HTTP(S).
	#[error("The {endpoint} endpoint must use http or https: {url}.")]
	UnsupportedScheme {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// Scope separator is empty or contains a control character.
	#[error("Scope separator must be non-empty printable text.")]
	InvalidScopeSeparator {
		/// Invalid separator that was supplied.
		separator: String,
	},
	/// Scopes cannot be normalized.
	#[error("Requested scopes are invalid.")]
	InvalidScope(#[from] crate::auth::ScopeValidationError),
	/// Token endpoint returned an excessively large `expires_in`.
	#[error("The expires_in value exceeds the supported range.")]
	ExpiresInOutOfRange,
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Temporary token endpoint failures (safe to retry).
#[derive(Debug, ThisError)]
pub enum TransientError {
	/// Provider returned an unexpected but non-fatal response.
	#[error("Token endpoint returned an unexpected response: {message}.")]
	TokenEndpoint {
		/// Message summarizing the failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
	/// Token endpoint responded with JSON that could not be parsed.
	#[error("Token endpoint returned malformed JSON.")]
	TokenResponseParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::error::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
}

/// Failures talking to the provider, wrapped by [`Error::Upstream`].
#[derive(Debug, ThisError)]
pub enum UpstreamError {
	/// Network or IO failure.
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Provider answered with a non-success status.
	#[error("Provider responded with HTTP {status}.")]
	Status {
		/// HTTP status code.
		status: u16,
		/// Response body, kept for diagnostics.
		body: String,
	},
	/// Outbound request could not be assembled.
	#[error("Request could not be built.")]
	InvalidRequest(#[from] oauth2::http::Error),
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the provider.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the provider.")]
	Io(#[from] std::io::Error),
	/// HTTP client reported a failure without a typed error.
	#[error("HTTP client error: {message}.")]
	Other {
		/// Client-supplied message.
		message: String,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
