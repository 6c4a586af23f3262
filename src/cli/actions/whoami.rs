use crate::{cli::actions::tab::Tab, cli::globals::GlobalArgs};
use anyhow::{bail, Result};

/// # Errors
/// Returns an error if there is no persisted session or it cannot be restored.
pub async fn execute(globals: &GlobalArgs) -> Result<()> {
    let tab = Tab::open(globals, &globals.config().landing_route)?;

    let result = tab.manager.load_session().await;
    tab.report();
    result?;

    let Some(user) = tab.manager.current_user() else {
        bail!("not signed in");
    };
    println!("{}", serde_json::to_string_pretty(&user)?);

    Ok(())
}
