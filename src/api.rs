//! HTTP client for the platform JSON API.
//!
//! Every call runs inside a `tracing` span carrying the method and URL, uses a
//! fixed timeout, and turns non-success responses into [`Error::Http`] with the
//! server-provided `message` when there is one. Tokens only ever travel in the
//! `Authorization` header and are never recorded.

use crate::{
    role::Role,
    types::{CuratorSignUp, Envelope, LoginRequest, LoginTokens, Profile, SessionTokens, SignUpData},
    APP_USER_AGENT,
};
use reqwest::{Client, Method, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::{
    future::Future,
    pin::Pin,
    sync::{PoisonError, RwLock},
    time::Duration,
};
use thiserror::Error;
use tracing::{debug, info_span, Instrument};
use url::Url;

/// Maximum number of error body characters surfaced to the user.
const MAX_ERROR_CHARS: usize = 200;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid API URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("request timed out")]
    Timeout,
    #[error("unable to reach the server: {0}")]
    Network(#[source] reqwest::Error),
    #[error("request failed ({status}): {message}")]
    Http { status: u16, message: String },
    #[error("failed to decode response: {0}")]
    Decode(#[source] reqwest::Error),
}

impl Error {
    /// One-line message suitable for a notification.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Http { message, .. } => message.clone(),
            Self::Timeout => "Tempo de resposta esgotado. Tente novamente.".to_string(),
            Self::Network(_) => "Não foi possível conectar ao servidor.".to_string(),
            other => other.to_string(),
        }
    }
}

pub type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, Error>> + Send + 'a>>;

/// Endpoints the session manager depends on.
pub trait SessionApi: Send + Sync {
    /// `POST login` and return the issued credentials.
    fn login<'a>(&'a self, request: LoginRequest<'a>) -> ApiFuture<'a, SessionTokens>;

    /// `GET institutions/{id}` or `GET curators/{id}` authenticated with `token`.
    fn fetch_profile<'a>(
        &'a self,
        role: Role,
        id: u64,
        token: &'a SecretString,
    ) -> ApiFuture<'a, Profile>;

    /// `POST institutions`.
    fn register_institution<'a>(&'a self, data: &'a SignUpData) -> ApiFuture<'a, ()>;

    /// `POST curators` with `admin: false`.
    fn register_curator<'a>(&'a self, data: &'a SignUpData) -> ApiFuture<'a, ()>;

    /// Sets or clears the bearer credential sent by default on every request.
    fn set_bearer(&self, token: Option<SecretString>);
}

#[derive(Debug)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
    bearer: RwLock<Option<SecretString>>,
}

impl ApiClient {
    /// # Errors
    /// Returns an error if `base_url` is not an absolute URL or the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, Error> {
        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(Error::Client)?;

        Ok(Self {
            client,
            base_url: base_url_with_slash(base_url)?,
            bearer: RwLock::new(None),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Returns true if a default bearer credential is installed.
    #[must_use]
    pub fn has_bearer(&self) -> bool {
        self.bearer
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn endpoint(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    fn request(&self, method: Method, url: Url, token: Option<&SecretString>) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match token {
            Some(token) => builder.bearer_auth(token.expose_secret()),
            None => match &*self.bearer.read().unwrap_or_else(PoisonError::into_inner) {
                Some(default) => builder.bearer_auth(default.expose_secret()),
                None => builder,
            },
        }
    }

    async fn send(&self, name: &'static str, builder: RequestBuilder) -> Result<Response, Error> {
        let request = builder.build().map_err(Error::Client)?;
        let span = info_span!(
            "api.request",
            api.call = name,
            http.method = %request.method(),
            url = %request.url()
        );

        async {
            let response = self
                .client
                .execute(request)
                .await
                .map_err(map_request_error)?;
            debug!(status = response.status().as_u16(), "response received");
            ensure_success(response).await
        }
        .instrument(span)
        .await
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        name: &'static str,
        builder: RequestBuilder,
    ) -> Result<T, Error> {
        let response = self.send(name, builder).await?;
        let envelope: Envelope<T> = response.json().await.map_err(|err| {
            if err.is_timeout() {
                Error::Timeout
            } else {
                Error::Decode(err)
            }
        })?;
        Ok(envelope.data)
    }
}

impl SessionApi for ApiClient {
    fn login<'a>(&'a self, request: LoginRequest<'a>) -> ApiFuture<'a, SessionTokens> {
        Box::pin(async move {
            let url = self.endpoint("login")?;
            let builder = self.request(Method::POST, url, None).json(&request);
            let tokens: LoginTokens = self.send_json("login", builder).await?;
            Ok(tokens.into())
        })
    }

    fn fetch_profile<'a>(
        &'a self,
        role: Role,
        id: u64,
        token: &'a SecretString,
    ) -> ApiFuture<'a, Profile> {
        Box::pin(async move {
            let url = self.endpoint(&format!("{}/{id}", role.profile_collection()))?;
            let builder = self.request(Method::GET, url, Some(token));
            self.send_json("fetch_profile", builder).await
        })
    }

    fn register_institution<'a>(&'a self, data: &'a SignUpData) -> ApiFuture<'a, ()> {
        Box::pin(async move {
            let url = self.endpoint("institutions")?;
            let builder = self.request(Method::POST, url, None).json(data);
            self.send("register_institution", builder).await?;
            Ok(())
        })
    }

    fn register_curator<'a>(&'a self, data: &'a SignUpData) -> ApiFuture<'a, ()> {
        Box::pin(async move {
            let url = self.endpoint("curators")?;
            let builder = self
                .request(Method::POST, url, None)
                .json(&CuratorSignUp::new(data));
            self.send("register_curator", builder).await?;
            Ok(())
        })
    }

    fn set_bearer(&self, token: Option<SecretString>) {
        *self.bearer.write().unwrap_or_else(PoisonError::into_inner) = token;
    }
}

/// Parses `base_url` and makes sure relative endpoints join under its path.
fn base_url_with_slash(base_url: &str) -> Result<Url, Error> {
    let trimmed = base_url.trim();
    if trimmed.ends_with('/') {
        Ok(Url::parse(trimmed)?)
    } else {
        Ok(Url::parse(&format!("{trimmed}/"))?)
    }
}

fn map_request_error(err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::Timeout
    } else {
        Error::Network(err)
    }
}

async fn ensure_success(response: Response) -> Result<Response, Error> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(Error::Http {
        status: status.as_u16(),
        message: error_message(&body),
    })
}

/// Extracts `{message}` from an error body, falling back to the sanitized body.
fn error_message(body: &str) -> String {
    let from_json = serde_json::from_str::<Value>(body).ok().and_then(|json| {
        json.get("message")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|message| !message.is_empty())
            .map(ToString::to_string)
    });

    from_json.unwrap_or_else(|| sanitize_body(body))
}

fn sanitize_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        "Request failed.".to_string()
    } else {
        trimmed.chars().take(MAX_ERROR_CHARS).collect()
    }
}
