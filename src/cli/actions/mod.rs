pub mod login;
pub mod logout;
pub mod signup;
pub mod tab;
pub mod whoami;

// Single dispatch point lives in `run` so this module stays small.
mod run;

use crate::cli::globals::GlobalArgs;

#[derive(Debug)]
pub enum Action {
    Login(login::Args),
    SignUp(signup::Args),
    Logout(GlobalArgs),
    WhoAmI(GlobalArgs),
}

impl Action {
    /// Execute the action.
    /// # Errors
    /// Returns an error if the action fails.
    pub async fn execute(self) -> anyhow::Result<()> {
        run::execute(self).await
    }
}
