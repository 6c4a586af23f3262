//! The session manager: owns the authenticated user for one tab, mediates
//! every credential operation and keeps sibling tabs consistent.
//!
//! Flow overview: `load_session` restores the user from the persisted bearer
//! token at startup. `sign_in` exchanges credentials for a token pair, resolves
//! the profile and only then persists the pair. `sign_out` clears persisted
//! credentials, notifies sibling tabs over the auth channel and leaves private
//! pages. A tab receiving that signal performs the same local teardown without
//! broadcasting again, so a sign-out crosses each tab exactly once.
//!
//! Every operation that mutates the session runs under one async writer lock,
//! so overlapping calls apply in arrival order instead of racing. Reads never
//! wait on I/O.

mod error;

pub use self::error::Error;

use crate::{
    api::SessionApi,
    channel::{AuthChannel, AuthSignal},
    config::Config,
    navigation::Navigator,
    notify::Notifier,
    role::{self, ActorType, Role},
    routes,
    store::{CookieOptions, CredentialStore},
    token,
    types::{LoginRequest, SessionTokens, SessionUser, SignUpData},
};
use secrecy::{ExposeSecret, SecretString};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::{sync::Mutex, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

pub const SIGN_IN_SUCCESS: &str = "Autenticação realizada com sucesso.";
pub const SIGN_UP_SUCCESS: &str = "Cadastro realizado com sucesso.";

/// Authentication state of one tab.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Session {
    pub current_user: Option<SessionUser>,
}

impl Session {
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.current_user.is_some()
    }
}

/// External services the manager talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub api: Arc<dyn SessionApi>,
    pub store: Arc<dyn CredentialStore>,
    pub navigator: Arc<dyn Navigator>,
    pub notifier: Arc<dyn Notifier>,
}

pub struct SessionManager {
    config: Config,
    api: Arc<dyn SessionApi>,
    store: Arc<dyn CredentialStore>,
    navigator: Arc<dyn Navigator>,
    notifier: Arc<dyn Notifier>,
    channel: AuthChannel,
    state: RwLock<Session>,
    writer: Mutex<()>,
    shutdown: CancellationToken,
}

impl SessionManager {
    #[must_use]
    pub fn new(config: Config, collaborators: Collaborators, channel: AuthChannel) -> Self {
        Self {
            config,
            api: collaborators.api,
            store: collaborators.store,
            navigator: collaborators.navigator,
            notifier: collaborators.notifier,
            channel,
            state: RwLock::new(Session::default()),
            writer: Mutex::new(()),
            shutdown: CancellationToken::new(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub fn channel(&self) -> &AuthChannel {
        &self.channel
    }

    #[must_use]
    pub fn session(&self) -> Session {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn current_user(&self) -> Option<SessionUser> {
        self.session().current_user
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_authenticated()
    }

    fn set_user(&self, user: Option<SessionUser>) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .current_user = user;
    }

    /// Restores the session from the persisted bearer token.
    ///
    /// Without a persisted token this is a no-op and makes no network call.
    /// Any failure signs the user out everywhere.
    ///
    /// # Errors
    /// Returns the failure after notifying the user and clearing all credentials.
    #[instrument(skip_all)]
    pub async fn load_session(&self) -> Result<(), Error> {
        let _writer = self.writer.lock().await;

        match self.restore().await {
            Ok(Some(user)) => {
                info!(user_id = user.id(), role = ?user.role, "session restored");
                self.set_user(Some(user));
                Ok(())
            }
            Ok(None) => {
                debug!("no persisted session");
                Ok(())
            }
            Err(err) => {
                warn!("session restore failed: {err}");
                self.notifier.error(&err.notification_message());
                self.sign_out_locked();
                self.sign_out_user();
                Err(err)
            }
        }
    }

    async fn restore(&self) -> Result<Option<SessionUser>, Error> {
        let token = match self.store.get(&self.config.token_cookie())? {
            Some(token) if !token.is_empty() => SecretString::from(token),
            _ => return Ok(None),
        };

        let user = self.resolve_user(&token).await?;
        self.api.set_bearer(Some(token));
        Ok(Some(user))
    }

    /// Decodes the token, derives access and fetches the matching profile.
    async fn resolve_user(&self, token: &SecretString) -> Result<SessionUser, Error> {
        let claims = token::decode(token.expose_secret())?;
        let access = role::derive(&claims);

        let mut profile = self.api.fetch_profile(access.role, claims.id, token).await?;
        if profile.id != claims.id {
            return Err(Error::ProfileMismatch {
                expected: claims.id,
                found: profile.id,
            });
        }
        // Derived access wins over same-named profile fields.
        profile.extra.remove("role");
        profile.extra.remove("permission");

        Ok(SessionUser {
            profile,
            role: access.role,
            permission: access.permission,
        })
    }

    /// Exchanges credentials for a session and navigates to the landing route.
    ///
    /// Credentials are only persisted once the profile has been resolved, so
    /// a failed attempt leaves nothing behind.
    ///
    /// # Errors
    /// Returns the failure after notifying the user.
    #[instrument(skip(self, email, password))]
    pub async fn sign_in(
        &self,
        email: &str,
        password: &SecretString,
        actor_type: ActorType,
    ) -> Result<SessionUser, Error> {
        let _writer = self.writer.lock().await;

        match self.establish(email, password, actor_type).await {
            Ok(user) => {
                info!(user_id = user.id(), role = ?user.role, "signed in");
                self.notifier.success(SIGN_IN_SUCCESS);
                self.navigator.push(&self.config.landing_route);
                Ok(user)
            }
            Err(err) => {
                warn!("sign in failed: {err}");
                self.notifier.error(&err.notification_message());
                Err(err)
            }
        }
    }

    async fn establish(
        &self,
        email: &str,
        password: &SecretString,
        actor_type: ActorType,
    ) -> Result<SessionUser, Error> {
        let email = email.trim();
        if email.is_empty() || password.expose_secret().is_empty() {
            return Err(Error::InvalidCredentials);
        }

        let tokens = self
            .api
            .login(LoginRequest {
                email,
                password: password.expose_secret(),
                actor_type,
            })
            .await?;

        let user = self.resolve_user(&tokens.token).await?;
        if user.role != Role::from(actor_type) {
            warn!(requested = %actor_type, role = ?user.role, "token role differs from requested actor type");
        }

        self.persist(&tokens)?;
        self.set_user(Some(user.clone()));
        self.api.set_bearer(Some(tokens.token.clone()));
        Ok(user)
    }

    /// Writes both credential slots, or neither.
    fn persist(&self, tokens: &SessionTokens) -> Result<(), Error> {
        let options = CookieOptions {
            max_age: self.config.cookie_max_age,
            path: self.config.cookie_path.clone(),
        };
        let token_cookie = self.config.token_cookie();
        let refresh_cookie = self.config.refresh_cookie();

        let written = self
            .store
            .set(&token_cookie, tokens.token.expose_secret(), &options)
            .and_then(|()| {
                self.store.set(
                    &refresh_cookie,
                    tokens.refresh_token.expose_secret(),
                    &options,
                )
            });

        if let Err(err) = written {
            for name in [&token_cookie, &refresh_cookie] {
                if let Err(rollback) = self.store.remove(name) {
                    warn!(name = %name, "failed to roll back credential: {rollback}");
                }
            }
            return Err(err.into());
        }

        Ok(())
    }

    /// Registers a new institution and sends the visitor to the sign-in page.
    ///
    /// # Errors
    /// Returns the failure after notifying the user.
    #[instrument(skip_all)]
    pub async fn sign_up(&self, data: &SignUpData) -> Result<(), Error> {
        let result = self.api.register_institution(data).await;
        self.finish_sign_up(result.map_err(Error::from))
    }

    /// Registers a new curator without administrator rights.
    ///
    /// # Errors
    /// Returns the failure after notifying the user.
    #[instrument(skip_all)]
    pub async fn sign_up_curator(&self, data: &SignUpData) -> Result<(), Error> {
        let result = self.api.register_curator(data).await;
        self.finish_sign_up(result.map_err(Error::from))
    }

    fn finish_sign_up(&self, result: Result<(), Error>) -> Result<(), Error> {
        match result {
            Ok(()) => {
                info!("registration accepted");
                self.notifier.success(SIGN_UP_SUCCESS);
                self.navigator.push(&self.config.sign_in_route);
                Ok(())
            }
            Err(err) => {
                warn!("registration failed: {err}");
                self.notifier.error(&err.notification_message());
                Err(err)
            }
        }
    }

    /// Signs out in this tab and every sibling tab. Safe to call without a session.
    #[instrument(skip_all)]
    pub async fn sign_out(&self) {
        let _writer = self.writer.lock().await;
        self.sign_out_locked();
    }

    fn sign_out_locked(&self) {
        self.clear_credentials();
        let receivers = self.channel.post(AuthSignal::SignOut);
        debug!(receivers, "sign-out broadcast");
        self.leave_private_route();
    }

    /// Clears the user in this tab only. Persisted credentials and sibling
    /// tabs are left untouched.
    pub fn sign_out_user(&self) {
        self.set_user(None);
    }

    fn clear_credentials(&self) {
        for name in [self.config.token_cookie(), self.config.refresh_cookie()] {
            if let Err(err) = self.store.remove(&name) {
                warn!(name = %name, "failed to remove credential: {err}");
            }
        }
        self.api.set_bearer(None);
        self.set_user(None);
    }

    fn leave_private_route(&self) {
        let current = self.navigator.current_route();
        if !routes::is_public(&self.config.public_routes, &current) {
            self.navigator.push(&self.config.root_route);
        }
    }

    /// Applies a signal received from a sibling tab. Never re-broadcasts.
    #[instrument(skip(self))]
    pub async fn handle_signal(&self, signal: AuthSignal) {
        let _writer = self.writer.lock().await;
        match signal {
            AuthSignal::SignOut => {
                info!("signed out by another tab");
                self.clear_credentials();
                self.leave_private_route();
            }
        }
    }

    /// Subscribes to the auth channel and applies incoming signals until the
    /// manager is dropped. The task holds only a weak reference to the manager.
    pub fn spawn_listener(self: &Arc<Self>) -> JoinHandle<()> {
        let mut inbox = self.channel.subscribe();
        let manager = Arc::downgrade(self);
        let shutdown = self.shutdown.clone();

        tokio::spawn(async move {
            loop {
                let signal = tokio::select! {
                    () = shutdown.cancelled() => break,
                    signal = inbox.recv() => signal,
                };
                let Some(signal) = signal else {
                    break;
                };
                let Some(manager) = manager.upgrade() else {
                    break;
                };
                manager.handle_signal(signal).await;
            }
            debug!("auth listener stopped");
        })
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

#[cfg(test)]
mod tests;
