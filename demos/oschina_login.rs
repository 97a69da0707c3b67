//! Runs one OSChina login from the terminal: prints the authorize URL, reads the callback URL the
//! browser lands on, then exchanges the code and prints the normalized profile.
//!
//! ```sh
//! OSCHINA_CLIENT_ID=... OSCHINA_CLIENT_SECRET=... cargo run --example oschina_login
//! ```

// std
use std::{env, io};
// crates.io
use color_eyre::{Result, eyre::eyre};
// self
use oauth2_oschina::{
	auth::{ScopeList, TokenSet},
	profile::Profile,
	strategy::{CallbackParams, Strategy, StrategyOptions, Verified},
	url::Url,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let callback_url = env::var("OSCHINA_CALLBACK_URL")
		.unwrap_or_else(|_| "http://localhost:3000/auth/oschina/callback".into());
	let options = StrategyOptions::new(
		env::var("OSCHINA_CLIENT_ID")?,
		env::var("OSCHINA_CLIENT_SECRET")?,
		Url::parse(&callback_url)?,
	)
	.scope(ScopeList::new(["user_api"])?);
	let strategy = Strategy::new(options, |tokens: TokenSet, profile: Profile| async move {
		println!("Access token expires at {:?}.", tokens.expires_at);

		Ok::<_, oauth2_oschina::error::Error>(Verified::User(profile))
	})?;
	let session = strategy.start_authorization(None);

	println!("Send your browser to {}.", session.authorize_url);
	println!("Paste the full callback URL here:");

	let mut line = String::new();

	io::stdin().read_line(&mut line)?;

	let callback = CallbackParams::from_url(&Url::parse(line.trim())?);

	match strategy.authenticate(&session, &callback).await? {
		Verified::User(profile) => println!("{}", serde_json::to_string_pretty(&profile)?),
		Verified::Rejected { message } =>
			return Err(eyre!("Login rejected: {}.", message.unwrap_or_default())),
	}

	Ok(())
}
