use crate::{cli::actions::tab::Tab, cli::globals::GlobalArgs, role::ActorType};
use anyhow::Result;
use secrecy::SecretString;
use tracing::info;

#[derive(Debug)]
pub struct Args {
    pub globals: GlobalArgs,
    pub email: String,
    pub password: SecretString,
    pub actor_type: ActorType,
}

/// # Errors
/// Returns an error if the credentials are rejected or the session cannot be persisted.
pub async fn execute(args: Args) -> Result<()> {
    let tab = Tab::open(&args.globals, &args.globals.config().sign_in_route)?;

    let result = tab
        .manager
        .sign_in(&args.email, &args.password, args.actor_type)
        .await;
    tab.report();

    let user = result?;
    info!(user_id = user.id(), role = ?user.role, "session saved to {}", args.globals.cookie_jar.display());

    Ok(())
}
