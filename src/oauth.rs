//! OAuth 2.0 client used by the strategy: code exchange plus authenticated GET requests.

pub use oauth2;

// crates.io
use oauth2::{
	AsyncHttpClient, AuthType, AuthUrl, AuthorizationCode, ClientId, ClientSecret, EndpointNotSet,
	EndpointSet, HttpClientError, PkceCodeVerifier, RedirectUrl, RequestTokenError, TokenResponse,
	TokenUrl,
	basic::{BasicClient, BasicErrorResponse, BasicRequestTokenError, BasicTokenResponse},
	http::{
		Method, Request,
		header::{ACCEPT, AUTHORIZATION},
	},
};
// self
use crate::{
	_prelude::*,
	auth::{TokenSecret, TokenSet},
	error::{ConfigError, TransientError, TransportError, UpstreamError},
	http::{ProviderHttpClient, ResponseMetadata, ResponseMetadataSlot},
	strategy::{ClientAuthMethod, StrategyConfig},
};

type ConfiguredBasicClient =
	BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

const TOKEN_CONTEXT: &str = "Failed to obtain access token";

/// Where [`OAuth2Client::get`] puts the access token.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AccessTokenPlacement {
	/// `access_token` query parameter.
	#[default]
	Query,
	/// `Authorization: Bearer` header.
	Header,
}

/// OAuth 2.0 client bound to one provider's endpoints and client credentials.
///
/// Token exchanges go through [`oauth2::basic::BasicClient`]; GET requests are built here and
/// sent through the same [`ProviderHttpClient`] transport.
pub struct OAuth2Client<C>
where
	C: ?Sized + ProviderHttpClient,
{
	oauth_client: ConfiguredBasicClient,
	http_client: Arc<C>,
	get_token_placement: AccessTokenPlacement,
}
impl<C> OAuth2Client<C>
where
	C: ?Sized + ProviderHttpClient,
{
	/// Builds a client from a resolved strategy configuration.
	///
	/// The client starts with [`AccessTokenPlacement::Query`] for GET requests.
	pub fn new(config: &StrategyConfig, http_client: impl Into<Arc<C>>) -> Self {
		let mut oauth_client = BasicClient::new(ClientId::new(config.client_id.clone()))
			.set_client_secret(ClientSecret::new(config.client_secret.expose().to_owned()))
			.set_auth_uri(AuthUrl::from_url(config.endpoints.authorization.clone()))
			.set_token_uri(TokenUrl::from_url(config.endpoints.token.clone()))
			.set_redirect_uri(RedirectUrl::from_url(config.callback_url.clone()));

		if matches!(config.client_auth, ClientAuthMethod::ClientSecretPost) {
			oauth_client = oauth_client.set_auth_type(AuthType::RequestBody);
		}

		Self {
			oauth_client,
			http_client: http_client.into(),
			get_token_placement: AccessTokenPlacement::default(),
		}
	}

	/// Sends the access token as an `Authorization` header on GET requests instead of a query
	/// parameter.
	pub fn use_authorization_header_for_get(mut self, enabled: bool) -> Self {
		self.get_token_placement =
			if enabled { AccessTokenPlacement::Header } else { AccessTokenPlacement::Query };

		self
	}

	/// Current access-token placement for GET requests.
	pub fn get_token_placement(&self) -> AccessTokenPlacement {
		self.get_token_placement
	}

	/// Issues one GET to `url` authenticated with `access_token` and returns the body.
	///
	/// Non-2xx responses are failures carrying the status and body.
	pub async fn get(
		&self,
		url: &Url,
		access_token: &TokenSecret,
	) -> Result<String, UpstreamError> {
		let mut target = url.clone();
		let mut builder = Request::builder().method(Method::GET).header(ACCEPT, "application/json");

		match self.get_token_placement {
			AccessTokenPlacement::Header =>
				builder = builder.header(AUTHORIZATION, format!("Bearer {}", access_token.expose())),
			AccessTokenPlacement::Query => {
				target.query_pairs_mut().append_pair("access_token", access_token.expose());
			},
		}

		let request = builder.uri(target.as_str()).body(Vec::new())?;
		let handle = self.http_client.with_metadata(ResponseMetadataSlot::default());
		let response = handle.call(request).await.map_err(map_http_client_error)?;
		let status = response.status();
		let body = String::from_utf8_lossy(response.body()).into_owned();

		if !status.is_success() {
			return Err(UpstreamError::Status { status: status.as_u16(), body });
		}

		Ok(body)
	}

	/// Exchanges an authorization code for tokens at the token endpoint.
	///
	/// The configured callback URL is sent as `redirect_uri`; `pkce_verifier` is attached when
	/// the authorization request carried a challenge.
	pub async fn exchange_code(
		&self,
		code: &str,
		pkce_verifier: Option<&str>,
	) -> Result<TokenSet> {
		let meta = ResponseMetadataSlot::default();
		let handle = self.http_client.with_metadata(meta.clone());
		let mut request = self.oauth_client.exchange_code(AuthorizationCode::new(code.to_owned()));

		if let Some(verifier) = pkce_verifier {
			request = request.set_pkce_verifier(PkceCodeVerifier::new(verifier.to_owned()));
		}

		let response = request
			.request_async(&handle)
			.await
			.map_err(|err| map_request_error(meta.take(), err))?;

		map_token_response(response)
	}
}
impl<C> Debug for OAuth2Client<C>
where
	C: ?Sized + ProviderHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("OAuth2Client")
			.field("client_id", self.oauth_client.client_id())
			.field("get_token_placement", &self.get_token_placement)
			.finish()
	}
}

fn map_token_response(response: BasicTokenResponse) -> Result<TokenSet> {
	let mut tokens = TokenSet::new(response.access_token().secret().to_owned());

	let token_type: &str = response.token_type().as_ref();

	tokens.token_type = token_type.to_owned();

	if let Some(refresh) = response.refresh_token() {
		tokens = tokens.with_refresh_token(refresh.secret().to_owned());
	}
	if let Some(expires_in) = response.expires_in() {
		let secs =
			i64::try_from(expires_in.as_secs()).map_err(|_| ConfigError::ExpiresInOutOfRange)?;

		tokens = tokens.with_expires_in(Duration::seconds(secs));
	}
	if let Some(scopes) = response.scopes() {
		tokens.scope = scopes.iter().map(|scope| scope.as_str().to_owned()).collect();
	}

	Ok(tokens)
}

fn map_request_error<E>(
	meta: Option<ResponseMetadata>,
	err: BasicRequestTokenError<HttpClientError<E>>,
) -> Error
where
	E: 'static + Send + Sync + StdError,
{
	let meta = meta.as_ref();

	match err {
		RequestTokenError::ServerResponse(response) => map_server_response_error(meta, response),
		RequestTokenError::Request(error) =>
			Error::upstream(TOKEN_CONTEXT, map_http_client_error(error)),
		RequestTokenError::Parse(error, _body) =>
			TransientError::TokenResponseParse { source: error, status: meta_status(meta) }.into(),
		RequestTokenError::Other(message) => TransientError::TokenEndpoint {
			message,
			status: meta_status(meta),
			retry_after: meta_retry_after(meta),
		}
		.into(),
	}
}

fn map_server_response_error(
	meta: Option<&ResponseMetadata>,
	response: BasicErrorResponse,
) -> Error {
	let code: &str = response.error().as_ref();
	let reason = match response.error_description() {
		Some(description) => format!("{code}: {description}"),
		None => code.to_owned(),
	};

	if code.eq_ignore_ascii_case("invalid_grant") || code.eq_ignore_ascii_case("access_denied") {
		Error::InvalidGrant { reason }
	} else if code.eq_ignore_ascii_case("invalid_client")
		|| code.eq_ignore_ascii_case("unauthorized_client")
	{
		Error::InvalidClient { reason }
	} else if code.eq_ignore_ascii_case("invalid_scope")
		|| code.eq_ignore_ascii_case("insufficient_scope")
	{
		Error::InsufficientScope { reason }
	} else {
		TransientError::TokenEndpoint {
			message: reason,
			status: meta_status(meta),
			retry_after: meta_retry_after(meta),
		}
		.into()
	}
}

fn map_http_client_error<E>(err: HttpClientError<E>) -> UpstreamError
where
	E: 'static + Send + Sync + StdError,
{
	match err {
		HttpClientError::Reqwest(inner) => TransportError::network(*inner).into(),
		HttpClientError::Http(inner) => UpstreamError::InvalidRequest(inner),
		HttpClientError::Io(inner) => TransportError::Io(inner).into(),
		HttpClientError::Other(message) => TransportError::Other { message }.into(),
		_ => TransportError::Other { message: "unrecognized HTTP client failure".into() }.into(),
	}
}

fn meta_status(meta: Option<&ResponseMetadata>) -> Option<u16> {
	meta.and_then(|value| value.status)
}

fn meta_retry_after(meta: Option<&ResponseMetadata>) -> Option<Duration> {
	meta.and_then(|value| value.retry_after)
}

#[cfg(all(test, feature = "reqwest"))]
mod tests {
	// self
	use super::*;
	use crate::{http::ReqwestHttpClient, strategy::StrategyOptions};

	fn config(client_auth: ClientAuthMethod) -> StrategyConfig {
		StrategyOptions::new(
			"client-id",
			"secret",
			Url::parse("https://app.example.com/cb").expect("Callback URL should parse."),
		)
		.client_auth(client_auth)
		.resolve()
		.expect("Options should resolve.")
	}

	#[test]
	fn get_placement_defaults_to_query_and_can_switch_to_header() {
		let client = OAuth2Client::<ReqwestHttpClient>::new(
			&config(ClientAuthMethod::ClientSecretPost),
			ReqwestHttpClient::default(),
		);

		assert_eq!(client.get_token_placement(), AccessTokenPlacement::Query);

		let client = client.use_authorization_header_for_get(true);

		assert_eq!(client.get_token_placement(), AccessTokenPlacement::Header);
		assert_eq!(
			client.use_authorization_header_for_get(false).get_token_placement(),
			AccessTokenPlacement::Query
		);
	}

	#[test]
	fn debug_output_omits_client_secret() {
		let client = OAuth2Client::<ReqwestHttpClient>::new(
			&config(ClientAuthMethod::ClientSecretBasic),
			ReqwestHttpClient::default(),
		);
		let rendered = format!("{client:?}");

		assert!(rendered.contains("client-id"));
		assert!(!rendered.contains("secret\""));
	}

	#[test]
	fn server_errors_are_classified_by_code() {
		let response: BasicErrorResponse = serde_json::from_str(
			"{\"error\":\"invalid_grant\",\"error_description\":\"code already used\"}",
		)
		.expect("Error fixture should deserialize.");
		let err = map_server_response_error(None, response);

		assert!(
			matches!(err, Error::InvalidGrant { ref reason } if reason == "invalid_grant: code already used")
		);

		let response: BasicErrorResponse =
			serde_json::from_str("{\"error\":\"temporarily_unavailable\"}")
				.expect("Error fixture should deserialize.");
		let meta = ResponseMetadata { status: Some(503), retry_after: Some(Duration::seconds(5)) };
		let err = map_server_response_error(Some(&meta), response);

		assert!(matches!(
			err,
			Error::Transient(TransientError::TokenEndpoint { status: Some(503), .. })
		));
	}
}
