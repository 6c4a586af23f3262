use crate::{cli::actions::tab::Tab, cli::globals::GlobalArgs};
use anyhow::Result;
use tracing::info;

/// # Errors
/// Returns an error if the API URL is invalid.
pub async fn execute(globals: &GlobalArgs) -> Result<()> {
    let tab = Tab::open(globals, &globals.config().landing_route)?;

    tab.manager.sign_out().await;
    tab.report();

    info!("cleared {}", globals.cookie_jar.display());
    Ok(())
}
