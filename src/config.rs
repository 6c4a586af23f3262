//! Session manager configuration. Values here are public; never store
//! credentials in it.

use crate::{channel::AUTH_CHANNEL, routes::PUBLIC_ROUTES};
use std::time::Duration;

/// Default request timeout applied to every API call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
/// Lifetime of persisted credentials.
pub const COOKIE_MAX_AGE: Duration = Duration::from_secs(60 * 60 * 24 * 30);
pub const COOKIE_PREFIX: &str = "fazumbem";

#[derive(Clone, Debug)]
pub struct Config {
    pub api_base_url: String,
    pub request_timeout: Duration,
    pub cookie_prefix: String,
    pub cookie_max_age: Duration,
    pub cookie_path: String,
    pub channel_name: String,
    pub landing_route: String,
    pub sign_in_route: String,
    pub root_route: String,
    pub public_routes: Vec<String>,
}

impl Config {
    /// Builds a configuration for `api_base_url` with the platform defaults.
    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            request_timeout: DEFAULT_TIMEOUT,
            cookie_prefix: COOKIE_PREFIX.to_string(),
            cookie_max_age: COOKIE_MAX_AGE,
            cookie_path: "/".to_string(),
            channel_name: AUTH_CHANNEL.to_string(),
            landing_route: "/dashboard".to_string(),
            sign_in_route: "/sign".to_string(),
            root_route: "/".to_string(),
            public_routes: PUBLIC_ROUTES.iter().map(ToString::to_string).collect(),
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Name of the bearer token slot, e.g. `fazumbem.token`.
    #[must_use]
    pub fn token_cookie(&self) -> String {
        format!("{}.token", self.cookie_prefix)
    }

    /// Name of the refresh credential slot, e.g. `fazumbem.refreshToken`.
    #[must_use]
    pub fn refresh_cookie(&self) -> String {
        format!("{}.refreshToken", self.cookie_prefix)
    }
}
