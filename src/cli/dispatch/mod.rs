use crate::{
    cli::{
        actions::{login, signup, Action},
        commands::{
            signup::{ARG_EMAIL, ARG_NAME, ARG_PASSWORD, ARG_PASSWORD_CONFIRMATION},
            ARG_API_URL, ARG_COOKIE_JAR, ARG_TIMEOUT, ARG_TYPE, CMD_LOGIN, CMD_LOGOUT,
            CMD_SIGNUP, CMD_SIGNUP_CURATOR, CMD_WHOAMI,
        },
        globals::GlobalArgs,
    },
    role::ActorType,
    types::SignUpData,
};
use anyhow::{anyhow, bail, Context, Result};
use clap::ArgMatches;
use secrecy::SecretString;
use std::{path::PathBuf, time::Duration};

fn globals(matches: &ArgMatches) -> Result<GlobalArgs> {
    let api_url = matches
        .get_one::<String>(ARG_API_URL)
        .cloned()
        .context("missing required argument: --api-url")?;
    let cookie_jar = matches
        .get_one::<String>(ARG_COOKIE_JAR)
        .map(PathBuf::from)
        .context("missing required argument: --cookie-jar")?;
    let timeout = matches.get_one::<u64>(ARG_TIMEOUT).copied().unwrap_or(10);

    Ok(GlobalArgs::new(api_url, cookie_jar).with_timeout(Duration::from_secs(timeout)))
}

fn required(matches: &ArgMatches, id: &str) -> Result<String> {
    matches
        .get_one::<String>(id)
        .cloned()
        .with_context(|| format!("missing required argument: --{id}"))
}

fn sign_up_data(matches: &ArgMatches) -> Result<SignUpData> {
    let optional = |id: &str| matches.get_one::<String>(id).cloned();
    let password = required(matches, ARG_PASSWORD)?;

    Ok(SignUpData {
        email: required(matches, ARG_EMAIL)?,
        password_confirmation: optional(ARG_PASSWORD_CONFIRMATION)
            .unwrap_or_else(|| password.clone()),
        password,
        name: required(matches, ARG_NAME)?,
        corporate_name: optional("corporate-name"),
        cnpj: optional("cnpj"),
        description: optional("description"),
        address: optional("address"),
        address_number: optional("address-number"),
        address_complement: optional("address-complement"),
        neighborhood: optional("neighborhood"),
        postal_code: optional("postal-code"),
        state: optional("state"),
        city: optional("city"),
        main_phone: optional("main-phone"),
        secondary_phone: optional("secondary-phone"),
    })
}

/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &ArgMatches) -> Result<Action> {
    let globals = globals(matches)?;

    match matches.subcommand() {
        Some((CMD_LOGIN, sub_m)) => {
            let actor_type = required(sub_m, ARG_TYPE)?
                .parse::<ActorType>()
                .map_err(|e| anyhow!(e))?;

            Ok(Action::Login(login::Args {
                globals,
                email: required(sub_m, ARG_EMAIL)?,
                password: SecretString::from(required(sub_m, ARG_PASSWORD)?),
                actor_type,
            }))
        }
        Some((CMD_SIGNUP, sub_m)) => Ok(Action::SignUp(signup::Args {
            globals,
            data: sign_up_data(sub_m)?,
            curator: false,
        })),
        Some((CMD_SIGNUP_CURATOR, sub_m)) => Ok(Action::SignUp(signup::Args {
            globals,
            data: sign_up_data(sub_m)?,
            curator: true,
        })),
        Some((CMD_LOGOUT, _)) => Ok(Action::Logout(globals)),
        Some((CMD_WHOAMI, _)) => Ok(Action::WhoAmI(globals)),
        Some((other, _)) => bail!("unknown command: {other}"),
        None => bail!("missing command"),
    }
}
