//! # Fazumbem (Session Manager)
//!
//! `fazumbem` is the authentication context of the fazumbem campaign platform.
//! Institutions and curators sign in with e-mail and password; the API answers
//! with a bearer token and a refresh credential that are persisted as cookies.
//!
//! ## Session lifecycle
//!
//! - **Startup:** the persisted bearer token is decoded (no signature check,
//!   the API is the authority) to learn the actor id, role and permission. The
//!   matching profile is fetched to complete the session.
//! - **Sign-in:** credentials are exchanged for a token pair. Nothing is
//!   persisted until the profile is resolved.
//! - **Sign-out:** both credential slots are removed, sibling tabs are told
//!   over the `auth` channel, and private pages are left for `/`.
//!
//! ## Tabs
//!
//! Each [`session::SessionManager`] models one browser tab. Tabs share a
//! [`store::CredentialStore`] and an [`channel::AuthHub`]. A sign-out in one tab
//! reaches every other tab exactly once.

pub mod api;
pub mod channel;
pub mod cli;
pub mod config;
pub mod navigation;
pub mod notify;
pub mod role;
pub mod routes;
pub mod session;
pub mod store;
pub mod token;
pub mod types;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(
            GIT_COMMIT_HASH.len() >= 7,
            "GIT_COMMIT_HASH should be at least 7 characters long, got: {GIT_COMMIT_HASH}"
        );
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with("fazumbem/"));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
