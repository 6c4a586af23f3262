//! Request and response payloads exchanged with the platform API. Login and
//! signup payloads carry passwords and tokens, so they must never be logged;
//! their `Debug` output is redacted.

use crate::role::{ActorType, Permission, Role};
use secrecy::SecretString;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Number, Value};
use std::fmt;

/// Success envelope wrapping every API response body.
#[derive(Clone, Debug, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
}

#[derive(Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
    #[serde(rename = "type")]
    pub actor_type: ActorType,
}

#[derive(Deserialize)]
pub struct LoginTokens {
    pub token: String,
    #[serde(rename = "refreshToken")]
    pub refresh_token: String,
}

/// Bearer and refresh credentials returned by a successful login.
pub struct SessionTokens {
    pub token: SecretString,
    pub refresh_token: SecretString,
}

impl From<LoginTokens> for SessionTokens {
    fn from(tokens: LoginTokens) -> Self {
        Self {
            token: SecretString::from(tokens.token),
            refresh_token: SecretString::from(tokens.refresh_token),
        }
    }
}

impl fmt::Debug for SessionTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionTokens").finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Loose {
    Text(String),
    Number(Number),
}

/// Accepts fields the API returns either as strings or as numbers (CNPJ,
/// postal code, phone numbers) and keeps them as text.
fn loose_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(
        Option::<Loose>::deserialize(deserializer)?.map(|value| match value {
            Loose::Text(text) => text,
            Loose::Number(number) => number.to_string(),
        }),
    )
}

/// Institution or curator profile as returned by the API.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: u64,
    pub email: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corporate_name: Option<String>,
    #[serde(
        default,
        deserialize_with = "loose_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub cnpj: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_complement: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub neighborhood: Option<String>,
    #[serde(
        default,
        deserialize_with = "loose_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub postal_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(
        default,
        deserialize_with = "loose_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub main_phone: Option<String>,
    #[serde(
        default,
        deserialize_with = "loose_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub secondary_phone: Option<String>,
    #[serde(
        default,
        deserialize_with = "loose_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub address_latitude: Option<String>,
    #[serde(
        default,
        deserialize_with = "loose_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub address_longitude: Option<String>,
    /// Any other field the API returns, kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Authenticated actor: the fetched profile plus access derived from the token.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SessionUser {
    #[serde(flatten)]
    pub profile: Profile,
    pub role: Role,
    pub permission: Option<Permission>,
}

impl SessionUser {
    #[must_use]
    pub fn id(&self) -> u64 {
        self.profile.id
    }
}

/// Registration payload shared by institutions and curators.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct SignUpData {
    pub email: String,
    pub password: String,
    pub password_confirmation: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub corporate_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cnpj: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_complement: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub neighborhood: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub main_phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary_phone: Option<String>,
}

impl fmt::Debug for SignUpData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignUpData")
            .field("email", &self.email)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Curator registrations are always created without administrator rights.
#[derive(Serialize)]
pub struct CuratorSignUp<'a> {
    #[serde(flatten)]
    pub data: &'a SignUpData,
    pub admin: bool,
}

impl<'a> CuratorSignUp<'a> {
    #[must_use]
    pub fn new(data: &'a SignUpData) -> Self {
        Self { data, admin: false }
    }
}
