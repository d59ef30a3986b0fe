//! Administrative command line: help, install and uninstall

pub mod args;
pub mod commands;
pub mod database;

#[cfg(windows)]
pub mod scm;

use crate::error::WrapperExit;
use crate::service::descriptor::{RunAs, ServiceDescriptor};
use args::{CliArgs, CliCommand, InstallArgs};
use commands::Account;
use database::ServiceDatabase;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::{debug, info};

/// One administrative command execution
pub struct Cli<'a, R> {
    descriptor: &'a ServiceDescriptor,
    database: &'a dyn ServiceDatabase,
    executable: PathBuf,
    input: R,
}

impl<'a, R: BufRead> Cli<'a, R> {
    /// `executable` is the binary registered on install; `input` answers the password prompt
    pub fn new(
        descriptor: &'a ServiceDescriptor,
        database: &'a dyn ServiceDatabase,
        executable: PathBuf,
        input: R,
    ) -> Self {
        Self {
            descriptor,
            database,
            executable,
            input,
        }
    }

    /// Run the command named in `args` (program name first)
    pub fn run(&mut self, args: &[String]) -> WrapperExit {
        if matches!(args.get(1).map(String::as_str), Some("--help" | "-h")) {
            return self.help();
        }

        let parsed = match CliArgs::parse_from_args(args) {
            Ok(parsed) => parsed,
            Err(e) => {
                if args.get(1).map(String::as_str) == Some("install") {
                    let message = e.to_string();
                    eprintln!("{}", message.lines().next().unwrap_or_default());
                    print!("{}", self.install_usage());
                } else {
                    eprintln!("Unknown command!");
                    println!("Add argument \"help\" for help.");
                }
                return WrapperExit::CliSyntaxError;
            }
        };

        match parsed.command {
            CliCommand::Help(_) => self.help(),
            CliCommand::Install(install_args) => self.install(install_args),
            CliCommand::Uninstall(_) => self.uninstall(),
        }
    }

    fn help(&self) -> WrapperExit {
        print!("{}", self.usage());
        WrapperExit::Ok
    }

    fn install(&mut self, args: InstallArgs) -> WrapperExit {
        let account = match self.resolve_account(args) {
            Ok(account) => account,
            Err(exit) => return exit,
        };

        println!("Installing {} service...", self.descriptor.name);

        match commands::install_service(self.database, self.descriptor, &self.executable, account)
        {
            Ok(registration) => {
                info!(
                    "Installed service {} ({})",
                    registration.name,
                    registration.binary_path()
                );
                println!("Service installation succeeded!");
                WrapperExit::Ok
            }
            Err(e) => {
                debug!("Install failed: {:?}", e);
                eprintln!("{}", e);
                println!("Service installation failed!");
                WrapperExit::CliScmError
            }
        }
    }

    fn uninstall(&self) -> WrapperExit {
        println!("Uninstalling {} service...", self.descriptor.name);

        match commands::uninstall_service(self.database, &self.descriptor.name) {
            Ok(()) => {
                info!("Uninstalled service {}", self.descriptor.name);
                println!("Service uninstallation succeeded!");
                WrapperExit::Ok
            }
            Err(e) => {
                debug!("Uninstall failed: {:?}", e);
                eprintln!("{}", e);
                println!("Service uninstallation failed!");
                WrapperExit::CliScmError
            }
        }
    }

    /// Work out the service account from the configured run-as identity and options
    fn resolve_account(&mut self, args: InstallArgs) -> Result<Account, WrapperExit> {
        if self.descriptor.run_as != RunAs::Custom {
            if args.has_account() {
                println!("Usage: {} install", self.binary_name());
                return Err(WrapperExit::CliSyntaxError);
            }
            return Ok(Account {
                name: self.descriptor.run_as.account_name().map(String::from),
                password: None,
            });
        }

        let Some(user) = args.user else {
            print!("{}", self.install_usage());
            return Err(WrapperExit::CliSyntaxError);
        };

        let password = match args.password {
            None => None,
            Some(Some(password)) => Some(password),
            Some(None) => match self.prompt_password(&user) {
                Ok(password) => password,
                Err(e) => {
                    eprintln!("Failed to read password: {}", e);
                    return Err(WrapperExit::CliSyntaxError);
                }
            },
        };

        Ok(Account {
            name: Some(user),
            password,
        })
    }

    /// Ask for the account password; an empty answer means no password
    fn prompt_password(&mut self, user: &str) -> io::Result<Option<String>> {
        print!("Enter password for user {} (empty = no password): ", user);
        io::stdout().flush()?;

        let mut line = String::new();
        self.input.read_line(&mut line)?;
        let password = line.trim_end_matches(['\r', '\n']);
        Ok((!password.is_empty()).then(|| password.to_string()))
    }

    fn binary_name(&self) -> String {
        self.executable
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.executable.display().to_string())
    }

    /// Usage text of the help command
    pub fn usage(&self) -> String {
        let install = if self.descriptor.run_as == RunAs::Custom {
            "install -u user [-p [password]]"
        } else {
            "install"
        };
        format!(
            "Usage: {bin} [command]\n\n\
             Where [command] is one of:\n\n\
             \x20 help         Displays this message.\n\
             \x20 {install:<12} Installs the {name} service. (Needs admin privileges!)\n\
             \x20 uninstall    Uninstalls the {name} service. (Needs admin privileges!)\n\n",
            bin = self.binary_name(),
            install = install,
            name = self.descriptor.name,
        )
    }

    /// Usage text of the install command with a custom account
    pub fn install_usage(&self) -> String {
        if self.descriptor.run_as != RunAs::Custom {
            return format!("Usage: {} install\n", self.binary_name());
        }
        format!(
            "Usage: {} install -u username [-p [password]]\n\n\
             \x20 -u user    Set username for the service. This option is mandatory!\n\
             \x20 -p [pass]  Set password for the service. This is optional.\n\
             \x20            If the option is not specified, the service\n\
             \x20            will have no (=empty) password. If specified\n\
             \x20            without value, the password will be asked for.\n\n",
            self.binary_name()
        )
    }
}
