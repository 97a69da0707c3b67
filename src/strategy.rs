//! OSChina login strategy: redirect construction, callback handling, and profile retrieval.
//!
//! [`Strategy`] composes an [`OAuth2Client`] configured with the OSChina endpoints. A login runs
//! in two halves:
//!
//! 1. [`Strategy::start_authorization`] returns an [`AuthorizationSession`] whose
//!    `authorize_url` the user agent is redirected to.
//! 2. [`Strategy::authenticate`] consumes the callback parameters, exchanges the code, fetches
//!    and normalizes the profile, then hands both to the application's [`Verify`] hook.

pub mod options;
pub mod session;
pub mod verify;

pub use options::*;
pub use session::*;
pub use verify::*;

// self
use crate::{
	_prelude::*,
	auth::{ScopeList, TokenSecret, TokenSet},
	http::ProviderHttpClient,
	oauth::OAuth2Client,
	obs::{self, FlowKind},
	profile::Profile,
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

/// Strategy name used when registering with an authentication framework.
pub const NAME: &str = "OSChina";
/// Default provider label written to normalized profiles.
pub const PROVIDER: &str = "oschina";
/// Label historically written by earlier OSChina adapters, available through
/// [`StrategyOptions::provider_label`].
pub const LEGACY_PROVIDER: &str = "github";

const PROFILE_FETCH_CONTEXT: &str = "Failed to fetch user profile";
const STATE_MISMATCH: &str = "Unable to verify authorization request state.";
const ACCESS_DENIED: &str = "access_denied";

/// Strategy backed by the crate's default reqwest transport.
#[cfg(feature = "reqwest")]
pub type ReqwestStrategy<V> = Strategy<V, ReqwestHttpClient>;

/// OSChina OAuth 2.0 strategy.
///
/// Immutable after construction and safe to share across concurrent logins.
pub struct Strategy<V, C>
where
	V: Verify,
	C: ?Sized + ProviderHttpClient,
{
	config: StrategyConfig,
	client: OAuth2Client<C>,
	verify: V,
}
#[cfg(feature = "reqwest")]
impl<V> Strategy<V, ReqwestHttpClient>
where
	V: Verify,
{
	/// Creates a strategy using [`ReqwestHttpClient::new`].
	pub fn new(options: StrategyOptions, verify: V) -> Result<Self> {
		Self::with_http_client(options, verify, ReqwestHttpClient::new()?)
	}
}
impl<V, C> Strategy<V, C>
where
	V: Verify,
	C: ?Sized + ProviderHttpClient,
{
	/// Creates a strategy that sends every request through `http_client`.
	///
	/// Options are resolved first, so missing credentials or malformed endpoints surface here
	/// and never at request time.
	pub fn with_http_client(
		options: StrategyOptions,
		verify: V,
		http_client: impl Into<Arc<C>>,
	) -> Result<Self> {
		let config = options.resolve()?;
		let client = OAuth2Client::new(&config, http_client).use_authorization_header_for_get(true);

		Ok(Self { config, client, verify })
	}

	/// Strategy name, always [`NAME`].
	pub fn name(&self) -> &'static str {
		NAME
	}

	/// Resolved configuration.
	pub fn config(&self) -> &StrategyConfig {
		&self.config
	}

	/// Underlying OAuth 2.0 client.
	pub fn client(&self) -> &OAuth2Client<C> {
		&self.client
	}

	/// Builds the authorization redirect.
	///
	/// `scope` overrides the configured default scopes for this request only.
	pub fn start_authorization(&self, scope: Option<&ScopeList>) -> AuthorizationSession {
		let scope = scope.cloned().unwrap_or_else(|| self.config.scope.clone());
		let session = session::build_session(&self.config, scope);

		#[cfg(feature = "tracing")]
		::tracing::debug!(
			authorize_url = %session.authorize_url,
			pkce = session.code_challenge().is_some(),
			"Built OSChina authorization redirect."
		);

		session
	}

	/// Exchanges an authorization code issued for `session`.
	pub async fn exchange_code(
		&self,
		session: &AuthorizationSession,
		code: &str,
	) -> Result<TokenSet> {
		obs::observe(
			FlowKind::TokenExchange,
			"exchange_code",
			self.client.exchange_code(code, session.pkce_verifier()),
		)
		.await
	}

	/// Fetches the OSChina user payload with `access_token` and normalizes it.
	///
	/// The request carries an `Authorization: Bearer` header. Transport failures and non-2xx
	/// responses surface as [`Error::Upstream`]; an undecodable body as [`Error::ProfileParse`].
	/// The returned profile keeps the response body in `raw` and its decoded form in `json`.
	pub async fn user_profile(&self, access_token: &TokenSecret) -> Result<Profile> {
		obs::observe(FlowKind::UserProfile, "user_profile", async {
			let body = self
				.client
				.get(&self.config.endpoints.user_profile, access_token)
				.await
				.map_err(|e| Error::upstream(PROFILE_FETCH_CONTEXT, e))?;
			let json = serde_json::from_str::<Value>(&body)
				.map_err(|source| Error::ProfileParse { source })?;
			let mut profile = Profile::from_json(&json);

			profile.provider = self.config.provider_label.clone();
			profile.raw = Some(body);
			profile.json = Some(json);

			Ok(profile)
		})
		.await
	}

	/// Completes a login from the callback parameters.
	///
	/// - A provider `access_denied` error or a state mismatch yields [`Verified::Rejected`].
	/// - Any other provider error yields [`Error::Authorization`].
	/// - A callback without a code yields [`Error::InvalidCallback`].
	///
	/// Otherwise the code is exchanged, the profile fetched, and the verify hook decides.
	pub async fn authenticate(
		&self,
		session: &AuthorizationSession,
		callback: &CallbackParams,
	) -> Result<Verified<V::User>> {
		obs::observe(FlowKind::Authenticate, "authenticate", async {
			if let Some(code) = callback.error.as_deref() {
				if code == ACCESS_DENIED {
					return Ok(Verified::Rejected { message: callback.error_description.clone() });
				}

				return Err(Error::Authorization {
					code: code.to_owned(),
					description: callback.error_description.clone(),
					uri: callback.error_uri.clone(),
				});
			}
			if !callback.state.as_deref().is_some_and(|state| session.state_matches(state)) {
				return Ok(Verified::rejected(STATE_MISMATCH));
			}

			let code = callback.code.as_deref().ok_or(Error::InvalidCallback)?;
			let tokens = self.exchange_code(session, code).await?;
			let profile = self.user_profile(&tokens.access_token).await?;

			self.verify.verify(tokens, profile).await
		})
		.await
	}
}
impl<V, C> Debug for Strategy<V, C>
where
	V: Verify,
	C: ?Sized + ProviderHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Strategy")
			.field("name", &NAME)
			.field("config", &self.config)
			.field("client", &self.client)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::collections::HashMap;
	// crates.io
	use oauth2::{
		AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse,
		http::{
			HeaderValue, StatusCode,
			header::{AUTHORIZATION, CONTENT_TYPE},
		},
	};
	// self
	use super::*;
	use crate::{
		error::{TransportError, UpstreamError},
		http::{ResponseMetadata, ResponseMetadataSlot},
	};

	const TOKEN_PATH: &str = "/action/openapi/token";
	const PROFILE_PATH: &str = "/action/openapi/user";
	const PROFILE_BODY: &str = r#"{"id":42,"email":"a@b.c","name":"A B","gender":"male","location":"X","url":"u","avatar":"p"}"#;

	#[derive(Clone, Default)]
	struct FakeTransport {
		routes: Arc<Mutex<HashMap<&'static str, (u16, String)>>>,
		requests: Arc<Mutex<Vec<HttpRequest>>>,
		offline: bool,
	}
	impl FakeTransport {
		fn route(self, path: &'static str, status: u16, body: &str) -> Self {
			self.routes.lock().insert(path, (status, body.to_owned()));

			self
		}

		fn offline() -> Self {
			Self { offline: true, ..Default::default() }
		}

		fn requests_to(&self, path: &str) -> Vec<HttpRequest> {
			self.requests.lock().iter().filter(|req| req.uri().path() == path).cloned().collect()
		}
	}
	impl ProviderHttpClient for FakeTransport {
		type Handle = FakeHandle;
		type TransportError = std::io::Error;

		fn with_metadata(&self, slot: ResponseMetadataSlot) -> Self::Handle {
			FakeHandle { transport: self.clone(), slot }
		}
	}

	struct FakeHandle {
		transport: FakeTransport,
		slot: ResponseMetadataSlot,
	}
	impl<'c> AsyncHttpClient<'c> for FakeHandle {
		type Error = HttpClientError<std::io::Error>;
		type Future = Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send>>;

		fn call(&'c self, request: HttpRequest) -> Self::Future {
			Box::pin(async move {
				let path = request.uri().path().to_owned();

				self.transport.requests.lock().push(request);

				if self.transport.offline {
					return Err(HttpClientError::Io(std::io::Error::other("connection reset")));
				}

				let (status, body) = self
					.transport
					.routes
					.lock()
					.get(path.as_str())
					.cloned()
					.unwrap_or((404, String::new()));
				let mut response = HttpResponse::new(body.into_bytes());

				*response.status_mut() =
					StatusCode::from_u16(status).expect("Fake route status should be valid.");
				response
					.headers_mut()
					.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
				self.slot.store(ResponseMetadata { status: Some(status), retry_after: None });

				Ok(response)
			})
		}
	}

	fn options() -> StrategyOptions {
		StrategyOptions::new(
			"ABC123",
			"secret",
			Url::parse("https://www.example.net/auth/oschina/callback")
				.expect("Callback URL fixture should parse."),
		)
	}

	struct AcceptAll;
	impl Verify for AcceptAll {
		type User = Profile;

		fn verify(
			&self,
			_: TokenSet,
			profile: Profile,
		) -> impl Future<Output = Result<Verified<Self::User>>> + Send {
			std::future::ready(Ok(Verified::User(profile)))
		}
	}

	fn strategy(transport: FakeTransport) -> Strategy<AcceptAll, FakeTransport> {
		Strategy::with_http_client(options(), AcceptAll, transport)
			.expect("Strategy fixture should build.")
	}

	#[test]
	fn strategy_is_named_oschina() {
		let strategy = strategy(FakeTransport::default());

		assert_eq!(strategy.name(), "OSChina");
		assert_eq!(strategy.config().endpoints.user_profile.as_str(), DEFAULT_USER_PROFILE_URL);
	}

	#[test]
	fn construction_rejects_missing_client_id() {
		let options = StrategyOptions::new(
			"",
			"secret",
			Url::parse("https://www.example.net/cb").expect("Callback URL fixture should parse."),
		);
		let err = Strategy::<_, FakeTransport>::with_http_client(
			options,
			AcceptAll,
			FakeTransport::default(),
		)
		.expect_err("Blank client IDs must be rejected.");

		assert!(matches!(err, Error::Config(crate::error::ConfigError::MissingClientId)));
	}

	#[tokio::test]
	async fn user_profile_sends_bearer_header_and_normalizes() {
		let transport = FakeTransport::default().route(PROFILE_PATH, 200, PROFILE_BODY);
		let strategy = strategy(transport.clone());
		let profile = strategy
			.user_profile(&TokenSecret::from("token"))
			.await
			.expect("Profile fetch should succeed.");
		let requests = transport.requests_to(PROFILE_PATH);

		assert_eq!(requests.len(), 1);
		assert_eq!(
			requests[0].headers().get(AUTHORIZATION).map(|value| value.as_bytes()),
			Some(&b"Bearer token"[..])
		);
		assert!(requests[0].uri().query().is_none());
		assert_eq!(profile.provider, PROVIDER);
		assert_eq!(profile.id, "42");
		assert_eq!(profile.username.as_deref(), Some("a@b.c"));
		assert_eq!(profile.display_name.as_deref(), Some("A B"));
		assert_eq!(profile.profile_url.as_deref(), Some("u"));
		assert_eq!(profile.photo(), Some("p"));
		assert_eq!(profile.raw.as_deref(), Some(PROFILE_BODY));
		assert_eq!(profile.json.as_ref().and_then(|json| json["id"].as_u64()), Some(42));
	}

	#[tokio::test]
	async fn user_profile_reports_parse_failures() {
		let strategy =
			strategy(FakeTransport::default().route(PROFILE_PATH, 200, "<html>not json</html>"));
		let err = strategy
			.user_profile(&TokenSecret::from("token"))
			.await
			.expect_err("Non-JSON bodies must fail.");

		assert!(matches!(err, Error::ProfileParse { .. }));
		assert_eq!(err.to_string(), "Failed to parse user profile.");
	}

	#[tokio::test]
	async fn user_profile_wraps_transport_failures() {
		let strategy = strategy(FakeTransport::offline());
		let err = strategy
			.user_profile(&TokenSecret::from("token"))
			.await
			.expect_err("Offline transports must fail.");

		assert!(matches!(
			err,
			Error::Upstream {
				context: PROFILE_FETCH_CONTEXT,
				source: UpstreamError::Transport(TransportError::Io(_)),
			}
		));
		assert_eq!(err.to_string(), "Failed to fetch user profile.");
	}

	#[tokio::test]
	async fn authenticate_runs_exchange_profile_and_verify() {
		let transport = FakeTransport::default()
			.route(
				TOKEN_PATH,
				200,
				r#"{"access_token":"at-1","token_type":"bearer","expires_in":3600,"refresh_token":"rt-1"}"#,
			)
			.route(PROFILE_PATH, 200, PROFILE_BODY);
		let strategy = strategy(transport.clone());
		let session = strategy.start_authorization(None);
		let callback = CallbackParams {
			code: Some("auth-code".into()),
			state: Some(session.state.clone()),
			..Default::default()
		};
		let verified = strategy
			.authenticate(&session, &callback)
			.await
			.expect("Authentication should succeed.");
		let profile = verified.into_user().expect("Verify hook should accept the profile.");

		assert_eq!(profile.id, "42");
		assert_eq!(transport.requests_to(TOKEN_PATH).len(), 1);

		let token_body = String::from_utf8(transport.requests_to(TOKEN_PATH)[0].body().clone())
			.expect("Token request body should be UTF-8.");

		assert!(token_body.contains("code=auth-code"));
		assert!(token_body.contains("client_id=ABC123"));
		assert!(token_body.contains("client_secret=secret"));
		assert_eq!(
			transport.requests_to(PROFILE_PATH)[0]
				.headers()
				.get(AUTHORIZATION)
				.map(|value| value.as_bytes()),
			Some(&b"Bearer at-1"[..])
		);
	}

	#[tokio::test]
	async fn authenticate_rejects_state_mismatch_without_network() {
		let transport = FakeTransport::default();
		let strategy = strategy(transport.clone());
		let session = strategy.start_authorization(None);
		let callback = CallbackParams::from_query("code=auth-code&state=forged");
		let verified =
			strategy.authenticate(&session, &callback).await.expect("Mismatch is not an error.");

		assert_eq!(verified, Verified::rejected(STATE_MISMATCH));
		assert!(transport.requests.lock().is_empty());
	}

	#[tokio::test]
	async fn authenticate_maps_provider_errors() {
		let strategy = strategy(FakeTransport::default());
		let session = strategy.start_authorization(None);
		let denied = CallbackParams::from_query(
			"error=access_denied&error_description=The+user+denied+your+request",
		);
		let verified =
			strategy.authenticate(&session, &denied).await.expect("Denial is not an error.");

		assert_eq!(
			verified,
			Verified::Rejected { message: Some("The user denied your request".into()) }
		);

		let failed = CallbackParams::from_query("error=server_error");
		let err = strategy
			.authenticate(&session, &failed)
			.await
			.expect_err("Provider errors other than denial must fail.");

		assert!(matches!(err, Error::Authorization { ref code, .. } if code == "server_error"));

		let missing = CallbackParams { state: Some(session.state.clone()), ..Default::default() };
		let err = strategy
			.authenticate(&session, &missing)
			.await
			.expect_err("Callbacks without a code must fail.");

		assert!(matches!(err, Error::InvalidCallback));
	}

	#[tokio::test]
	async fn authenticate_propagates_token_endpoint_errors() {
		let transport = FakeTransport::default().route(
			TOKEN_PATH,
			400,
			r#"{"error":"invalid_grant","error_description":"code expired"}"#,
		);
		let strategy = strategy(transport.clone());
		let session = strategy.start_authorization(None);
		let callback = CallbackParams {
			code: Some("stale".into()),
			state: Some(session.state.clone()),
			..Default::default()
		};
		let err = strategy
			.authenticate(&session, &callback)
			.await
			.expect_err("Rejected grants must fail.");

		assert!(matches!(err, Error::InvalidGrant { .. }));
		assert!(transport.requests_to(PROFILE_PATH).is_empty());
	}
}
