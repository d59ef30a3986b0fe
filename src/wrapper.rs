//! Process entry: choose between the administrative CLI and service mode

use crate::cli::database::{platform_database, ServiceDatabase};
use crate::cli::Cli;
use crate::error::WrapperExit;
use crate::logging;
use crate::service::config::ServiceSettings;
use crate::service::descriptor::ServiceDescriptor;
use crate::service::engine::LifecycleEngine;
use crate::service::host::{platform_dispatcher, Dispatcher};
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

/// Run `descriptor` as a service, or execute the administrative command given on the command line
///
/// Call this from the wrapped application's `main` and return its exit code:
///
/// ```no_run
/// use svcwrap::ServiceDescriptor;
///
/// fn main() {
///     let descriptor = ServiceDescriptor::new("EchoServer", "EchoServer example")
///         .with_main(|_args| 0)
///         .with_stop(|| {});
///     std::process::exit(svcwrap::run(descriptor).code());
/// }
/// ```
pub fn run(descriptor: ServiceDescriptor) -> WrapperExit {
    let args: Vec<String> = std::env::args_os()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect();

    let settings = ServiceSettings::load_default(&descriptor.name).unwrap_or_else(|e| {
        eprintln!("Warning: {}, using defaults", e);
        ServiceSettings::default()
    });

    let dispatcher = platform_dispatcher();
    let database = platform_database();
    run_with(
        &args,
        descriptor,
        &settings,
        &dispatcher,
        &database,
        io::stdin().lock(),
    )
}

/// [`run`] with explicit arguments, settings and OS adapters
///
/// More than one argument selects the CLI; otherwise the process attaches to
/// the service control dispatcher.
pub fn run_with<R: BufRead>(
    args: &[String],
    mut descriptor: ServiceDescriptor,
    settings: &ServiceSettings,
    dispatcher: &dyn Dispatcher,
    database: &dyn ServiceDatabase,
    input: R,
) -> WrapperExit {
    settings.apply(&mut descriptor);

    if let Err(e) = descriptor.validate() {
        eprintln!("Invalid service configuration! {}", e);
        return WrapperExit::InvalidConfig;
    }

    if args.len() > 1 {
        logging::init_cli_logging(settings);

        let executable = std::env::current_exe()
            .ok()
            .or_else(|| args.first().map(PathBuf::from))
            .unwrap_or_default();
        let mut cli = Cli::new(&descriptor, database, executable, input);
        return cli.run(args);
    }

    logging::init_service_logging(settings, descriptor.log.clone());
    run_service(Arc::new(descriptor), args, dispatcher)
}

fn run_service(
    descriptor: Arc<ServiceDescriptor>,
    args: &[String],
    dispatcher: &dyn Dispatcher,
) -> WrapperExit {
    let engine = match LifecycleEngine::new(descriptor.clone(), args.to_vec()) {
        Ok(engine) => Arc::new(engine),
        Err(e) => {
            error!("Invalid service configuration: {}", e);
            return WrapperExit::InvalidConfig;
        }
    };

    if let Err(e) = dispatcher.dispatch(&descriptor.name, engine.clone()) {
        error!("{}", e);
        println!("This application is a Windows Service executable!");
        println!("Add help argument for supported CLI commands.");
        return WrapperExit::CtrlDispatcherFailed;
    }

    if engine.registration_failed() {
        return WrapperExit::RegisterCtrlHandlerFailed;
    }

    info!("Service {} finished", descriptor.name);
    WrapperExit::Ok
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::database::memory::MemoryDatabase;
    use crate::service::host::UnsupportedDispatcher;
    use crate::service::state::{ServiceExit, ServicePhase};
    use crate::service::testing::{RecordingHost, ScriptedDispatcher};
    use std::io::Cursor;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;
    use std::time::Duration;

    fn descriptor() -> ServiceDescriptor {
        let running = Arc::new(AtomicBool::new(true));
        let stop_flag = running.clone();
        ServiceDescriptor::new("Svc", "Svc")
            .with_main(move |_| {
                while running.load(Ordering::SeqCst) {
                    thread::sleep(Duration::from_millis(2));
                }
                5
            })
            .with_stop(move || stop_flag.store(false, Ordering::SeqCst))
    }

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn no_input() -> Cursor<Vec<u8>> {
        Cursor::new(Vec::new())
    }

    #[test]
    fn test_dispatcher_attach_failure() {
        let db = MemoryDatabase::new();
        let exit = run_with(
            &args(&["prog"]),
            descriptor(),
            &ServiceSettings::default(),
            &UnsupportedDispatcher,
            &db,
            no_input(),
        );
        assert_eq!(exit, WrapperExit::CtrlDispatcherFailed);
        assert_eq!(exit.code(), 1000);
    }

    #[test]
    fn test_invalid_descriptor_never_runs() {
        let db = MemoryDatabase::new();
        let dispatcher = ScriptedDispatcher::new(RecordingHost::new());
        let invalid = ServiceDescriptor::new("Svc", "").with_main(|_| 0).with_stop(|| {});

        let exit = run_with(
            &args(&["prog", "install"]),
            invalid.clone(),
            &ServiceSettings::default(),
            &dispatcher,
            &db,
            no_input(),
        );
        assert_eq!(exit, WrapperExit::InvalidConfig);
        assert!(db.entries.borrow().is_empty());

        let exit = run_with(
            &args(&["prog"]),
            invalid,
            &ServiceSettings::default(),
            &dispatcher,
            &db,
            no_input(),
        );
        assert_eq!(exit, WrapperExit::InvalidConfig);
        assert!(dispatcher.dispatched.lock().is_none());
    }

    #[test]
    fn test_service_mode_runs_lifecycle() {
        let db = MemoryDatabase::new();
        let dispatcher = ScriptedDispatcher::new(RecordingHost::new());

        let exit = run_with(
            &args(&["prog"]),
            descriptor(),
            &ServiceSettings::default(),
            &dispatcher,
            &db,
            no_input(),
        );

        assert_eq!(exit, WrapperExit::Ok);
        assert_eq!(dispatcher.dispatched.lock().as_deref(), Some("Svc"));
        let last = dispatcher.host.reporter.last().unwrap();
        assert_eq!(last.phase, ServicePhase::Stopped);
        assert_eq!(last.exit, ServiceExit::ServiceSpecific(5));
    }

    #[test]
    fn test_handler_registration_failure() {
        let db = MemoryDatabase::new();
        let dispatcher = ScriptedDispatcher::new(RecordingHost::refusing());

        let exit = run_with(
            &args(&["prog"]),
            descriptor(),
            &ServiceSettings::default(),
            &dispatcher,
            &db,
            no_input(),
        );
        assert_eq!(exit, WrapperExit::RegisterCtrlHandlerFailed);
    }

    #[test]
    fn test_cli_install_registers_current_executable() {
        let db = MemoryDatabase::new();
        let exit = run_with(
            &args(&["prog", "install"]),
            descriptor(),
            &ServiceSettings::default(),
            &UnsupportedDispatcher,
            &db,
            no_input(),
        );

        assert_eq!(exit, WrapperExit::Ok);
        let entries = db.entries.borrow();
        assert_eq!(entries.len(), 1);
        let expected = format!("\"{}\"", std::env::current_exe().unwrap().display());
        assert_eq!(entries["Svc"].registration.binary_path(), expected);
    }

    #[test]
    fn test_settings_apply_before_install() {
        let db = MemoryDatabase::new();
        let settings = ServiceSettings {
            args: Some(vec!["--verbose".into()]),
            ..Default::default()
        };

        let exit = run_with(
            &args(&["prog", "install"]),
            descriptor(),
            &settings,
            &UnsupportedDispatcher,
            &db,
            no_input(),
        );

        assert_eq!(exit, WrapperExit::Ok);
        assert!(db
            .entry("Svc")
            .unwrap()
            .registration
            .binary_path()
            .ends_with("\" --verbose"));
    }
}
