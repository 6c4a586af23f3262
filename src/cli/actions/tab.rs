//! One session manager per CLI run, backed by the cookie jar on disk.

use crate::{
    api::ApiClient,
    channel::AuthHub,
    cli::globals::GlobalArgs,
    navigation::MemoryNavigator,
    notify::{Level, Notifier, Toast, Toasts},
    session::{Collaborators, SessionManager},
    store::FileStore,
};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::debug;

pub struct Tab {
    pub manager: Arc<SessionManager>,
    toasts: Arc<Toasts>,
}

impl Tab {
    /// # Errors
    /// Returns an error if the API URL is invalid or the HTTP client cannot be built.
    pub fn open(globals: &GlobalArgs, route: &str) -> Result<Self> {
        let config = globals.config();
        let api = ApiClient::new(&config.api_base_url, config.request_timeout)
            .with_context(|| format!("invalid API URL: {}", config.api_base_url))?;
        debug!(api = %api.base_url(), jar = %globals.cookie_jar.display(), "opening session");

        let toasts = Arc::new(Toasts::new());
        let channel = AuthHub::new().open(&config.channel_name);

        let manager = SessionManager::new(
            config,
            Collaborators {
                api: Arc::new(api),
                store: Arc::new(FileStore::new(&globals.cookie_jar)),
                navigator: Arc::new(MemoryNavigator::new(route)),
                notifier: Arc::clone(&toasts) as Arc<dyn Notifier>,
            },
            channel,
        );

        Ok(Self {
            manager: Arc::new(manager),
            toasts,
        })
    }

    /// Prints pending notifications, successes on stdout and errors on stderr.
    pub fn report(&self) {
        for Toast { level, message } in self.toasts.drain() {
            match level {
                Level::Success => println!("{message}"),
                Level::Error => eprintln!("{message}"),
            }
        }
    }
}
