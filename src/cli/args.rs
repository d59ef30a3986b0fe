//! CLI argument parsing using clap

use clap::{Args, Parser, Subcommand};

/// Administrative commands of a wrapped service executable
#[derive(Parser, Debug)]
#[command(disable_help_subcommand = true, disable_help_flag = true, disable_version_flag = true)]
pub struct CliArgs {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: CliCommand,
}

/// Available commands
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum CliCommand {
    /// Display usage information
    Help(IgnoredArgs),

    /// Install the service (needs admin privileges)
    Install(InstallArgs),

    /// Uninstall the service (needs admin privileges)
    Uninstall(IgnoredArgs),
}

/// Anything after a command that takes no options
#[derive(Args, Debug, Default, PartialEq, Eq)]
pub struct IgnoredArgs {
    #[arg(hide = true, num_args = 0.., trailing_var_arg = true, allow_hyphen_values = true)]
    pub rest: Vec<String>,
}

/// Options of the install command
#[derive(Args, Debug, Default, PartialEq, Eq)]
pub struct InstallArgs {
    /// Account the service runs as
    #[arg(short = 'u', long = "user", value_name = "USER")]
    pub user: Option<String>,

    /// Password for the account; prompted for when given without value
    #[arg(
        short = 'p',
        long = "password",
        value_name = "PASSWORD",
        num_args = 0..=1,
        requires = "user"
    )]
    pub password: Option<Option<String>>,
}

impl InstallArgs {
    /// Whether any account option was given
    pub fn has_account(&self) -> bool {
        self.user.is_some() || self.password.is_some()
    }
}

impl CliArgs {
    /// Parse the full argument vector, program name first
    pub fn parse_from_args<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Self::try_parse_from(args)
    }
}
