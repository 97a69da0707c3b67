//! Normalization of the OSChina user payload into the cross-provider profile shape.
//!
//! [`Profile::parse`] is pure: it accepts either the raw response text or an already decoded
//! [`Value`] and maps the OSChina field names onto the shared layout. Missing fields stay
//! `None`; only `id` is coerced (numbers and strings produce the same text).

// self
use crate::{_prelude::*, strategy::PROVIDER};

/// Errors raised while normalizing a profile payload.
#[derive(Debug, ThisError)]
pub enum ProfileError {
	/// Text input is not valid JSON.
	#[error("Profile payload is not valid JSON.")]
	Decode(#[from] serde_json::Error),
}

/// Normalizer input: raw JSON text or a decoded document.
#[derive(Clone, Copy, Debug)]
pub enum ProfileSource<'a> {
	/// JSON-encoded text.
	Text(&'a str),
	/// Already decoded JSON.
	Json(&'a Value),
}
impl<'a> From<&'a str> for ProfileSource<'a> {
	fn from(value: &'a str) -> Self {
		Self::Text(value)
	}
}
impl<'a> From<&'a String> for ProfileSource<'a> {
	fn from(value: &'a String) -> Self {
		Self::Text(value)
	}
}
impl<'a> From<&'a Value> for ProfileSource<'a> {
	fn from(value: &'a Value) -> Self {
		Self::Json(value)
	}
}

/// Single `{ value }` entry used for emails and photos.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileValue {
	/// Entry value, absent when the provider omitted it.
	pub value: Option<String>,
}
impl ProfileValue {
	/// Creates an entry holding `value`.
	pub fn new(value: impl Into<String>) -> Self {
		Self { value: Some(value.into()) }
	}
}

/// Cross-provider user profile.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
	/// Label identifying the provider that produced the profile.
	pub provider: String,
	/// Provider user identifier, always in string form.
	pub id: String,
	/// Login name; OSChina uses the account email.
	pub username: Option<String>,
	/// Full name.
	pub display_name: Option<String>,
	/// `male` or `female`, as reported by the provider.
	pub gender: Option<String>,
	/// Free-form location.
	pub location: Option<String>,
	/// Public profile page.
	pub profile_url: Option<String>,
	/// Email addresses; OSChina reports exactly one.
	pub emails: Vec<ProfileValue>,
	/// Avatar URLs; OSChina reports exactly one.
	pub photos: Vec<ProfileValue>,
	/// Response body the profile was parsed from.
	#[serde(rename = "_raw")]
	pub raw: Option<String>,
	/// Decoded response body.
	#[serde(rename = "_json")]
	pub json: Option<Value>,
}
impl Profile {
	/// Normalizes an OSChina user payload.
	///
	/// Text input is decoded first; a decoding failure is returned as is and no profile is
	/// produced. The result carries the default provider label and no raw payload.
	pub fn parse<'a>(input: impl Into<ProfileSource<'a>>) -> Result<Self, ProfileError> {
		match input.into() {
			ProfileSource::Text(text) => {
				let json = serde_json::from_str::<Value>(text)?;

				Ok(Self::from_json(&json))
			},
			ProfileSource::Json(json) => Ok(Self::from_json(json)),
		}
	}

	/// Normalizes an already decoded payload; this cannot fail.
	pub fn from_json(json: &Value) -> Self {
		let email = text_field(json, "email");

		Self {
			provider: PROVIDER.to_owned(),
			id: id_field(json),
			username: email.clone(),
			display_name: text_field(json, "name"),
			gender: text_field(json, "gender"),
			location: text_field(json, "location"),
			profile_url: text_field(json, "url"),
			emails: vec![ProfileValue { value: email }],
			photos: vec![ProfileValue { value: text_field(json, "avatar") }],
			raw: None,
			json: None,
		}
	}

	/// Returns the first email address, if any.
	pub fn email(&self) -> Option<&str> {
		self.emails.iter().find_map(|entry| entry.value.as_deref())
	}

	/// Returns the first photo URL, if any.
	pub fn photo(&self) -> Option<&str> {
		self.photos.iter().find_map(|entry| entry.value.as_deref())
	}
}

// JSON `null` and a missing `id` both become the empty string.
fn id_field(json: &Value) -> String {
	match json.get("id") {
		Some(Value::String(id)) => id.clone(),
		Some(Value::Null) | None => String::new(),
		Some(other) => value_text(other),
	}
}

fn text_field(json: &Value, key: &str) -> Option<String> {
	match json.get(key)? {
		Value::Null => None,
		Value::String(text) => Some(text.clone()),
		other => Some(value_text(other)),
	}
}

// Integral floats drop the fraction (`42.0` -> `42`, `1e3` -> `1000`).
fn value_text(value: &Value) -> String {
	match value {
		Value::Number(number) if number.is_f64() => match number.as_f64() {
			Some(float) if float == 0. => "0".into(),
			Some(float) if float.fract() == 0. && float.abs() < 1e21 => format!("{float:.0}"),
			_ => number.to_string(),
		},
		other => other.to_string(),
	}
}
