use crate::cli::actions::{login, logout, signup, whoami, Action};
use anyhow::Result;

/// Execute the provided action.
/// # Errors
/// Returns an error if the action fails.
pub async fn execute(action: Action) -> Result<()> {
    match action {
        Action::Login(args) => login::execute(args).await,
        Action::SignUp(args) => signup::execute(args).await,
        Action::Logout(globals) => logout::execute(&globals).await,
        Action::WhoAmI(globals) => whoami::execute(&globals).await,
    }
}
