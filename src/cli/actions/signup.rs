use crate::{cli::actions::tab::Tab, cli::globals::GlobalArgs, types::SignUpData};
use anyhow::Result;

#[derive(Debug)]
pub struct Args {
    pub globals: GlobalArgs,
    pub data: SignUpData,
    pub curator: bool,
}

/// # Errors
/// Returns an error if the registration is rejected.
pub async fn execute(args: Args) -> Result<()> {
    let tab = Tab::open(&args.globals, "/signup")?;

    let result = if args.curator {
        tab.manager.sign_up_curator(&args.data).await
    } else {
        tab.manager.sign_up(&args.data).await
    };
    tab.report();

    Ok(result?)
}
