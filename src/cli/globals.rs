use crate::config::{Config, DEFAULT_TIMEOUT};
use std::{path::PathBuf, time::Duration};

/// Connection settings shared by every subcommand.
#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub api_url: String,
    pub cookie_jar: PathBuf,
    pub timeout: Duration,
}

impl GlobalArgs {
    #[must_use]
    pub fn new(api_url: String, cookie_jar: PathBuf) -> Self {
        Self {
            api_url,
            cookie_jar,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn config(&self) -> Config {
        Config::new(self.api_url.clone()).with_timeout(self.timeout)
    }
}
