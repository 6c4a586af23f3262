//! Local decoding of the session token payload.
//!
//! The payload is read without verifying the signature: the API verifies the
//! token on every request, and a forged payload only changes which profile is
//! requested, which the API then rejects.

use crate::role::ActorType;
use base64ct::{Base64UrlUnpadded, Encoding};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid token format")]
    TokenFormat,
    #[error("invalid base64url encoding")]
    Base64,
    #[error("invalid token payload")]
    Json(#[from] serde_json::Error),
}

/// Claims embedded by the API in every session token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub id: u64,
    #[serde(rename = "type")]
    pub actor_type: ActorType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin: Option<bool>,
}

/// Decodes the payload segment of a `header.payload.signature` token.
///
/// # Errors
/// Returns an error if the token is not three dot-separated segments, the
/// payload is not base64url, or it does not hold the expected claims.
pub fn decode(token: &str) -> Result<Claims, Error> {
    let mut parts = token.trim().split('.');
    let (Some(_header), Some(payload), Some(_signature), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(Error::TokenFormat);
    };

    if payload.is_empty() {
        return Err(Error::TokenFormat);
    }

    // Some issuers keep the `=` padding even in base64url.
    let bytes =
        Base64UrlUnpadded::decode_vec(payload.trim_end_matches('=')).map_err(|_| Error::Base64)?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Builds an unsigned token around `claims`, for fixtures and local tooling.
///
/// # Errors
/// Returns an error if the claims cannot be serialized.
pub fn encode_unsigned(claims: &Claims) -> Result<String, Error> {
    let header = Base64UrlUnpadded::encode_string(br#"{"alg":"none","typ":"JWT"}"#);
    let payload = Base64UrlUnpadded::encode_string(&serde_json::to_vec(claims)?);
    Ok(format!("{header}.{payload}.signature"))
}
