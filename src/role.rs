//! Actor kinds and the access tier derived from a decoded session token.
//!
//! Derivation is a pure function of the token payload. It never consults the
//! API, so the role is known before the profile fetch starts and selects which
//! profile endpoint is queried.

use crate::token::Claims;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Principal kind carried in the token payload and in the login request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActorType {
    Institution,
    Curator,
}

impl ActorType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Institution => "institution",
            Self::Curator => "curator",
        }
    }
}

impl fmt::Display for ActorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActorType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "institution" => Ok(Self::Institution),
            "curator" => Ok(Self::Curator),
            other => Err(format!("unknown actor type: {other}")),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Institution,
    Curator,
}

impl Role {
    /// API collection holding profiles for this role.
    #[must_use]
    pub const fn profile_collection(self) -> &'static str {
        match self {
            Self::Institution => "institutions",
            Self::Curator => "curators",
        }
    }
}

impl From<ActorType> for Role {
    fn from(actor_type: ActorType) -> Self {
        match actor_type {
            ActorType::Institution => Self::Institution,
            ActorType::Curator => Self::Curator,
        }
    }
}

/// Curator-only authorization tier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Administrator,
    User,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Access {
    pub role: Role,
    pub permission: Option<Permission>,
}

/// Derives role and permission from token claims.
/// A missing `admin` flag is treated as `false`.
#[must_use]
pub fn derive(claims: &Claims) -> Access {
    match claims.actor_type {
        ActorType::Institution => Access {
            role: Role::Institution,
            permission: None,
        },
        ActorType::Curator => Access {
            role: Role::Curator,
            permission: Some(if claims.admin.unwrap_or(false) {
                Permission::Administrator
            } else {
                Permission::User
            }),
        },
    }
}
