use crate::{api, store, token};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("email and password are required")]
    InvalidCredentials,
    #[error(transparent)]
    Api(#[from] api::Error),
    #[error("invalid session token: {0}")]
    Token(#[from] token::Error),
    #[error("profile {found} does not match token subject {expected}")]
    ProfileMismatch { expected: u64, found: u64 },
    #[error(transparent)]
    Store(#[from] store::Error),
}

impl Error {
    /// Most specific one-line message to show the user.
    #[must_use]
    pub fn notification_message(&self) -> String {
        match self {
            Self::InvalidCredentials => "Informe e-mail e senha.".to_string(),
            Self::Api(err) => err.user_message(),
            Self::Token(_) | Self::ProfileMismatch { .. } => {
                "Sessão inválida. Entre novamente.".to_string()
            }
            Self::Store(_) => "Não foi possível salvar a sessão.".to_string(),
        }
    }
}
