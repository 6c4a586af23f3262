pub mod logging;
pub mod signup;

use crate::role::ActorType;
use clap::{
    builder::{
        styling::{AnsiColor, Effects, Styles},
        PossibleValuesParser,
    },
    Arg, ColorChoice, Command,
};

pub const ARG_API_URL: &str = "api-url";
pub const ARG_COOKIE_JAR: &str = "cookie-jar";
pub const ARG_TIMEOUT: &str = "timeout";
pub const ARG_TYPE: &str = "type";

pub const CMD_LOGIN: &str = "login";
pub const CMD_SIGNUP: &str = "signup";
pub const CMD_SIGNUP_CURATOR: &str = "signup-curator";
pub const CMD_LOGOUT: &str = "logout";
pub const CMD_WHOAMI: &str = "whoami";

fn login() -> Command {
    Command::new(CMD_LOGIN)
        .about("Sign in as an institution or curator")
        .arg(
            Arg::new(signup::ARG_EMAIL)
                .short('e')
                .long("email")
                .help("Account e-mail")
                .required(true),
        )
        .arg(
            Arg::new(signup::ARG_PASSWORD)
                .short('p')
                .long("password")
                .help("Account password")
                .env("FAZUMBEM_PASSWORD")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_TYPE)
                .short('t')
                .long("type")
                .help("Actor type")
                .default_value(ActorType::Institution.as_str())
                .value_parser(PossibleValuesParser::new([
                    ActorType::Institution.as_str(),
                    ActorType::Curator.as_str(),
                ])),
        )
}

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("fazumbem")
        .about("Session manager for the fazumbem campaign platform")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new(ARG_API_URL)
                .short('u')
                .long("api-url")
                .help("Base URL of the platform API, example: https://api.fazumbem.com.br")
                .env("FAZUMBEM_API_URL")
                .global(true),
        )
        .arg(
            Arg::new(ARG_COOKIE_JAR)
                .short('c')
                .long("cookie-jar")
                .help("File holding the persisted session cookies")
                .env("FAZUMBEM_COOKIE_JAR")
                .default_value("fazumbem-cookies.json")
                .global(true),
        )
        .arg(
            Arg::new(ARG_TIMEOUT)
                .long("timeout")
                .help("Request timeout in seconds")
                .env("FAZUMBEM_TIMEOUT")
                .default_value("10")
                .value_parser(clap::value_parser!(u64).range(1..))
                .global(true),
        )
        .subcommand(login())
        .subcommand(signup::command(CMD_SIGNUP, "Register a new institution"))
        .subcommand(signup::command(CMD_SIGNUP_CURATOR, "Register a new curator"))
        .subcommand(Command::new(CMD_LOGOUT).about("Sign out and clear the cookie jar"))
        .subcommand(
            Command::new(CMD_WHOAMI).about("Restore the persisted session and print the user"),
        );

    logging::with_args(command)
}
