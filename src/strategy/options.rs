//! Strategy options, OSChina endpoint defaults, and the resolved configuration.

// self
use crate::{
	_prelude::*,
	auth::{ScopeList, TokenSecret},
	error::ConfigError,
	strategy::PROVIDER,
};

/// OSChina authorization endpoint used when none is configured.
pub const DEFAULT_AUTHORIZATION_URL: &str = "http://www.oschina.net/action/oauth2/authorize";
/// OSChina token endpoint used when none is configured.
pub const DEFAULT_TOKEN_URL: &str = "http://www.oschina.net/action/openapi/token";
/// OSChina user-info endpoint used when none is configured.
pub const DEFAULT_USER_PROFILE_URL: &str = "http://www.oschina.net/action/openapi/user";
/// Separator OSChina expects between requested scopes.
pub const DEFAULT_SCOPE_SEPARATOR: &str = ",";

/// How the client authenticates itself at the token endpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientAuthMethod {
	#[default]
	/// Form POST body parameters for `client_id`/`client_secret`.
	ClientSecretPost,
	/// HTTP Basic with `client_id`/`client_secret`.
	ClientSecretBasic,
}

/// Caller-supplied strategy options.
///
/// Endpoint URLs and the scope separator are optional and fall back to the OSChina defaults
/// when [resolved](Self::resolve). Deserialization accepts the conventional camelCase keys
/// (`clientID`, `callbackURL`, `userProfileURL`, ...).
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyOptions {
	/// Application client identifier.
	#[serde(alias = "clientID")]
	pub client_id: String,
	/// Application client secret.
	pub client_secret: TokenSecret,
	/// Redirect URI OSChina sends the user back to.
	#[serde(alias = "callbackURL")]
	pub callback_url: Url,
	/// Authorization endpoint override.
	#[serde(default, alias = "authorizationURL")]
	pub authorization_url: Option<Url>,
	/// Token endpoint override.
	#[serde(default, alias = "tokenURL")]
	pub token_url: Option<Url>,
	/// User-info endpoint override.
	#[serde(default, alias = "userProfileURL")]
	pub user_profile_url: Option<Url>,
	/// Scope separator override.
	#[serde(default)]
	pub scope_separator: Option<String>,
	/// Scopes requested when the caller does not pass any.
	#[serde(default)]
	pub scope: ScopeList,
	/// Adds an S256 PKCE challenge to authorization requests.
	#[serde(default)]
	pub pkce: bool,
	/// Token endpoint client authentication.
	#[serde(default)]
	pub client_auth: ClientAuthMethod,
	/// Label written to [`Profile::provider`](crate::profile::Profile::provider).
	#[serde(default)]
	pub provider_label: Option<String>,
}
impl StrategyOptions {
	/// Creates options carrying the three required values.
	pub fn new(
		client_id: impl Into<String>,
		client_secret: impl Into<TokenSecret>,
		callback_url: Url,
	) -> Self {
		Self {
			client_id: client_id.into(),
			client_secret: client_secret.into(),
			callback_url,
			authorization_url: None,
			token_url: None,
			user_profile_url: None,
			scope_separator: None,
			scope: ScopeList::default(),
			pkce: false,
			client_auth: ClientAuthMethod::default(),
			provider_label: None,
		}
	}

	/// Overrides the authorization endpoint.
	pub fn authorization_url(mut self, url: Url) -> Self {
		self.authorization_url = Some(url);

		self
	}

	/// Overrides the token endpoint.
	pub fn token_url(mut self, url: Url) -> Self {
		self.token_url = Some(url);

		self
	}

	/// Overrides the user-info endpoint.
	pub fn user_profile_url(mut self, url: Url) -> Self {
		self.user_profile_url = Some(url);

		self
	}

	/// Overrides the scope separator.
	pub fn scope_separator(mut self, separator: impl Into<String>) -> Self {
		self.scope_separator = Some(separator.into());

		self
	}

	/// Sets the default scopes requested during authorization.
	pub fn scope(mut self, scope: ScopeList) -> Self {
		self.scope = scope;

		self
	}

	/// Enables or disables PKCE.
	pub fn pkce(mut self, enabled: bool) -> Self {
		self.pkce = enabled;

		self
	}

	/// Overrides the token endpoint client authentication.
	pub fn client_auth(mut self, method: ClientAuthMethod) -> Self {
		self.client_auth = method;

		self
	}

	/// Overrides the label written to normalized profiles.
	pub fn provider_label(mut self, label: impl Into<String>) -> Self {
		self.provider_label = Some(label.into());

		self
	}

	/// Applies defaults and validates the options.
	pub fn resolve(self) -> Result<StrategyConfig, ConfigError> {
		if self.client_id.trim().is_empty() {
			return Err(ConfigError::MissingClientId);
		}
		if self.client_secret.is_empty() {
			return Err(ConfigError::MissingClientSecret);
		}

		let endpoints = Endpoints {
			authorization: or_default(
				"authorization",
				self.authorization_url,
				DEFAULT_AUTHORIZATION_URL,
			)?,
			token: or_default("token", self.token_url, DEFAULT_TOKEN_URL)?,
			user_profile: or_default(
				"user profile",
				self.user_profile_url,
				DEFAULT_USER_PROFILE_URL,
			)?,
		};
		let scope_separator =
			self.scope_separator.unwrap_or_else(|| DEFAULT_SCOPE_SEPARATOR.to_owned());

		validate_endpoint("callback", &self.callback_url)?;
		validate_endpoint("authorization", &endpoints.authorization)?;
		validate_endpoint("token", &endpoints.token)?;
		validate_endpoint("user profile", &endpoints.user_profile)?;

		if scope_separator.is_empty() || scope_separator.chars().any(char::is_control) {
			return Err(ConfigError::InvalidScopeSeparator { separator: scope_separator });
		}

		Ok(StrategyConfig {
			client_id: self.client_id,
			client_secret: self.client_secret,
			callback_url: self.callback_url,
			endpoints,
			scope_separator,
			scope: self.scope,
			pkce: self.pkce,
			client_auth: self.client_auth,
			provider_label: self.provider_label.unwrap_or_else(|| PROVIDER.to_owned()),
		})
	}
}

/// Endpoint set the strategy talks to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoints {
	/// Authorization endpoint users are redirected to.
	pub authorization: Url,
	/// Token endpoint used for the code exchange.
	pub token: Url,
	/// User-info endpoint queried with the access token.
	pub user_profile: Url,
}

/// Resolved, immutable strategy configuration.
#[derive(Clone, Debug)]
pub struct StrategyConfig {
	/// Application client identifier.
	pub client_id: String,
	/// Application client secret.
	pub client_secret: TokenSecret,
	/// Redirect URI registered with OSChina.
	pub callback_url: Url,
	/// Provider endpoints with defaults applied.
	pub endpoints: Endpoints,
	/// Separator used to join scopes.
	pub scope_separator: String,
	/// Scopes requested when the caller does not pass any.
	pub scope: ScopeList,
	/// Whether authorization requests carry a PKCE challenge.
	pub pkce: bool,
	/// Token endpoint client authentication.
	pub client_auth: ClientAuthMethod,
	/// Label written to normalized profiles.
	pub provider_label: String,
}

fn or_default(
	name: &'static str,
	url: Option<Url>,
	default: &'static str,
) -> Result<Url, ConfigError> {
	match url {
		Some(url) => Ok(url),
		None => Url::parse(default)
			.map_err(|source| ConfigError::InvalidEndpoint { endpoint: name, source }),
	}
}

fn validate_endpoint(name: &'static str, url: &Url) -> Result<(), ConfigError> {
	match url.scheme() {
		"http" | "https" => Ok(()),
		_ => Err(ConfigError::UnsupportedScheme { endpoint: name, url: url.to_string() }),
	}
}
