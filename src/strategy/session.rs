//! Authorization redirect state and callback parameters.

// std
use std::borrow::Cow;
// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{Rng, distr::Alphanumeric};
use sha2::{Digest, Sha256};
// self
use crate::{_prelude::*, auth::ScopeList, strategy::StrategyConfig};

const STATE_LEN: usize = 32;
const PKCE_VERIFIER_LEN: usize = 64;

/// Supported PKCE challenge methods.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PkceCodeChallengeMethod {
	/// SHA-256 based PKCE (RFC 7636 S256).
	S256,
}
impl PkceCodeChallengeMethod {
	/// Returns the RFC 7636 identifier for the challenge method.
	pub fn as_str(self) -> &'static str {
		match self {
			PkceCodeChallengeMethod::S256 => "S256",
		}
	}
}

/// Redirect metadata returned by [`Strategy::start_authorization`](crate::strategy::Strategy::start_authorization).
///
/// The caller keeps the session (server-side session, signed cookie, ...) until the callback
/// arrives and then hands it to [`Strategy::authenticate`](crate::strategy::Strategy::authenticate).
#[derive(Clone, Serialize, Deserialize)]
pub struct AuthorizationSession {
	/// Opaque state value that must round-trip through the redirect.
	pub state: String,
	/// Scopes requested from the provider.
	pub scope: ScopeList,
	/// Redirect URI supplied on the authorize URL.
	pub redirect_uri: Url,
	/// Authorize URL the user agent should be sent to.
	pub authorize_url: Url,
	pkce: Option<PkcePair>,
}
impl AuthorizationSession {
	/// Returns true if `returned_state` equals the state issued with this session.
	pub fn state_matches(&self, returned_state: &str) -> bool {
		returned_state == self.state
	}

	/// PKCE code challenge, when PKCE is enabled.
	pub fn code_challenge(&self) -> Option<&str> {
		self.pkce.as_ref().map(|pkce| pkce.challenge.as_str())
	}

	/// PKCE challenge method, when PKCE is enabled.
	pub fn code_challenge_method(&self) -> Option<PkceCodeChallengeMethod> {
		self.pkce.as_ref().map(|pkce| pkce.method)
	}

	pub(crate) fn pkce_verifier(&self) -> Option<&str> {
		self.pkce.as_ref().map(|pkce| pkce.verifier.as_str())
	}
}
impl Debug for AuthorizationSession {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthorizationSession")
			.field("state", &self.state)
			.field("scope", &self.scope)
			.field("redirect_uri", &self.redirect_uri)
			.field("authorize_url", &self.authorize_url)
			.field("code_challenge", &self.code_challenge())
			.finish()
	}
}

#[derive(Clone, Serialize, Deserialize)]
struct PkcePair {
	verifier: String,
	challenge: String,
	method: PkceCodeChallengeMethod,
}
impl PkcePair {
	fn generate() -> Self {
		let verifier = random_string(PKCE_VERIFIER_LEN);
		let challenge = compute_pkce_challenge(&verifier);

		Self { verifier, challenge, method: PkceCodeChallengeMethod::S256 }
	}
}

/// Query parameters the provider appends to the callback URL.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackParams {
	/// Authorization code.
	pub code: Option<String>,
	/// State echoed back by the provider.
	pub state: Option<String>,
	/// OAuth error code.
	pub error: Option<String>,
	/// OAuth error description.
	pub error_description: Option<String>,
	/// OAuth error URI.
	pub error_uri: Option<String>,
}
impl CallbackParams {
	/// Reads the parameters from a full callback URL.
	pub fn from_url(url: &Url) -> Self {
		Self::from_pairs(url.query_pairs())
	}

	/// Reads the parameters from a raw query string (without the leading `?`).
	pub fn from_query(query: &str) -> Self {
		Self::from_pairs(url::form_urlencoded::parse(query.as_bytes()))
	}

	fn from_pairs<'a>(pairs: impl Iterator<Item = (Cow<'a, str>, Cow<'a, str>)>) -> Self {
		let mut params = Self::default();

		for (key, value) in pairs {
			let slot = match key.as_ref() {
				"code" => &mut params.code,
				"state" => &mut params.state,
				"error" => &mut params.error,
				"error_description" => &mut params.error_description,
				"error_uri" => &mut params.error_uri,
				_ => continue,
			};

			*slot = Some(value.into_owned());
		}

		params
	}
}

pub(crate) fn build_session(config: &StrategyConfig, scope: ScopeList) -> AuthorizationSession {
	let state = random_string(STATE_LEN);
	let pkce = config.pkce.then(PkcePair::generate);
	let authorize_url = build_authorize_url(config, &scope, &state, pkce.as_ref());

	AuthorizationSession {
		state,
		scope,
		redirect_uri: config.callback_url.clone(),
		authorize_url,
		pkce,
	}
}

fn build_authorize_url(
	config: &StrategyConfig,
	scope: &ScopeList,
	state: &str,
	pkce: Option<&PkcePair>,
) -> Url {
	let mut url = config.endpoints.authorization.clone();
	let mut pairs = url.query_pairs_mut();

	pairs.append_pair("response_type", "code");
	pairs.append_pair("client_id", &config.client_id);
	pairs.append_pair("redirect_uri", config.callback_url.as_str());

	if let Some(scope_value) = scope.join(&config.scope_separator) {
		pairs.append_pair("scope", &scope_value);
	}

	pairs.append_pair("state", state);

	if let Some(pkce) = pkce {
		pairs.append_pair("code_challenge", &pkce.challenge);
		pairs.append_pair("code_challenge_method", pkce.method.as_str());
	}

	drop(pairs);

	url
}

fn random_string(len: usize) -> String {
	rand::rng().sample_iter(Alphanumeric).take(len).map(char::from).collect()
}

fn compute_pkce_challenge(verifier: &str) -> String {
	let digest = Sha256::digest(verifier.as_bytes());

	URL_SAFE_NO_PAD.encode(digest)
}

#[cfg(test)]
mod tests {
	// std
	use std::collections::HashMap;
	// self
	use super::*;
	use crate::strategy::StrategyOptions;

	fn config(pkce: bool) -> StrategyConfig {
		StrategyOptions::new(
			"client-id",
			"secret",
			Url::parse("https://app.example.com/auth/oschina/callback")
				.expect("Callback URL fixture should parse."),
		)
		.pkce(pkce)
		.resolve()
		.expect("Session test options should resolve.")
	}

	#[test]
	fn authorize_url_joins_scopes_with_separator() {
		let scope =
			ScopeList::new(["user_api", "tweet_api"]).expect("Scope fixture should be valid.");
		let session = build_session(&config(false), scope);
		let pairs: HashMap<_, _> = session.authorize_url.query_pairs().into_owned().collect();

		assert!(session.authorize_url.as_str().starts_with(
			"http://www.oschina.net/action/oauth2/authorize?"
		));
		assert_eq!(pairs.get("response_type").map(String::as_str), Some("code"));
		assert_eq!(pairs.get("client_id").map(String::as_str), Some("client-id"));
		assert_eq!(
			pairs.get("redirect_uri").map(String::as_str),
			Some("https://app.example.com/auth/oschina/callback")
		);
		assert_eq!(pairs.get("scope").map(String::as_str), Some("user_api,tweet_api"));
		assert_eq!(pairs.get("state"), Some(&session.state));
		assert_eq!(session.state.len(), STATE_LEN);
		assert!(!pairs.contains_key("code_challenge"));
		assert_eq!(session.code_challenge(), None);
	}

	#[test]
	fn multi_character_separator_joins_scopes() {
		let config = StrategyOptions::new(
			"client-id",
			"secret",
			Url::parse("https://app.example.com/auth/oschina/callback")
				.expect("Callback URL fixture should parse."),
		)
		.scope_separator(", ")
		.resolve()
		.expect("Multi-character separators should resolve.");
		let scope =
			ScopeList::new(["user_api", "tweet_api"]).expect("Scope fixture should be valid.");
		let session = build_session(&config, scope);
		let pairs: HashMap<_, _> = session.authorize_url.query_pairs().into_owned().collect();

		assert_eq!(pairs.get("scope").map(String::as_str), Some("user_api, tweet_api"));
	}

	#[test]
	fn empty_scope_is_omitted() {
		let session = build_session(&config(false), ScopeList::default());

		assert!(session.authorize_url.query_pairs().all(|(key, _)| key != "scope"));
	}

	#[test]
	fn pkce_challenge_matches_verifier() {
		let session = build_session(&config(true), ScopeList::default());
		let verifier = session.pkce_verifier().expect("PKCE sessions should carry a verifier.");

		assert_eq!(verifier.len(), PKCE_VERIFIER_LEN);
		assert_eq!(session.code_challenge(), Some(compute_pkce_challenge(verifier).as_str()));
		assert_eq!(session.code_challenge_method(), Some(PkceCodeChallengeMethod::S256));
		assert!(!format!("{session:?}").contains(verifier));
	}

	#[test]
	fn pkce_challenge_follows_rfc_7636_example() {
		assert_eq!(
			compute_pkce_challenge("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"),
			"E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
		);
	}

	#[test]
	fn state_mismatch_is_detected() {
		let session = build_session(&config(false), ScopeList::default());
		let issued = session.state.clone();

		assert!(session.state_matches(&issued));
		assert!(!session.state_matches("forged"));
	}

	#[test]
	fn callback_params_parse_from_query_and_url() {
		let params = CallbackParams::from_query("code=abc&state=xyz&ignored=1");

		assert_eq!(params.code.as_deref(), Some("abc"));
		assert_eq!(params.state.as_deref(), Some("xyz"));
		assert_eq!(params.error, None);

		let url = Url::parse(
			"https://app.example.com/cb?error=access_denied&error_description=User%20denied",
		)
		.expect("Callback URL fixture should parse.");
		let params = CallbackParams::from_url(&url);

		assert_eq!(params.error.as_deref(), Some("access_denied"));
		assert_eq!(params.error_description.as_deref(), Some("User denied"));
		assert_eq!(params.code, None);
	}
}
