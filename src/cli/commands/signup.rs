use clap::{Arg, Command};

pub const ARG_EMAIL: &str = "email";
pub const ARG_PASSWORD: &str = "password";
pub const ARG_PASSWORD_CONFIRMATION: &str = "password-confirmation";
pub const ARG_NAME: &str = "name";

/// Optional profile fields accepted on registration, as (argument id, help).
pub const PROFILE_FIELDS: [(&str, &str); 12] = [
    ("corporate-name", "Corporate name"),
    ("cnpj", "CNPJ registration number"),
    ("description", "Short description"),
    ("address", "Street address"),
    ("address-number", "Address number"),
    ("address-complement", "Address complement"),
    ("neighborhood", "Neighborhood"),
    ("postal-code", "Postal code (CEP)"),
    ("state", "State"),
    ("city", "City"),
    ("main-phone", "Main phone"),
    ("secondary-phone", "Secondary phone"),
];

/// Registration subcommand with the shared account and profile arguments.
#[must_use]
pub fn command(name: &'static str, about: &'static str) -> Command {
    let command = Command::new(name)
        .about(about)
        .arg(
            Arg::new(ARG_EMAIL)
                .long("email")
                .help("Account e-mail")
                .required(true),
        )
        .arg(
            Arg::new(ARG_PASSWORD)
                .long("password")
                .help("Account password")
                .env("FAZUMBEM_PASSWORD")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_PASSWORD_CONFIRMATION)
                .long("password-confirmation")
                .help("Password confirmation (defaults to --password)"),
        )
        .arg(
            Arg::new(ARG_NAME)
                .long("name")
                .help("Display name")
                .required(true),
        );

    PROFILE_FIELDS
        .iter()
        .fold(command, |command, &(id, help)| {
            command.arg(Arg::new(id).long(id).help(help))
        })
}
