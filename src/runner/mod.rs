pub mod env;
pub mod launcher;
pub mod workdir;

pub use env::Settings;
pub use launcher::{Execute, Launcher};

use anyhow::Result;
use log::{debug, info};

use crate::common::{Config, GeneratedFile, Hooks, backend};

/// Run the wrapped tool for `args`, returning the exit code to report.
///
/// With a config found above the working directory the backend file is
/// generated first and removed afterwards. Otherwise the tool runs as-is.
pub fn wrap(args: &[String], settings: &Settings) -> Result<i32> {
    let workdir = workdir::resolve(args)?;

    let generated = match Config::locate(&workdir)? {
        Some(resolved) => {
            let content = backend::render(&resolved)?;
            Some(GeneratedFile::new(&resolved.workdir, content))
        }
        None => {
            info!("No configuration found, running without a generated backend");
            None
        }
    };

    let hooks = Hooks::new(generated, !settings.no_cleanup);
    let launcher = Launcher::new(settings.binary.as_str()).dry_run(settings.skip_exec);

    run_with_hooks(&hooks, &launcher, args)
}

/// Before hook, command, after hook. The after hook runs on every path.
pub fn run_with_hooks(hooks: &Hooks, exec: &dyn Execute, args: &[String]) -> Result<i32> {
    let outcome = hooks.run_before().and_then(|()| exec.execute(args));
    hooks.run_after();

    match &outcome {
        Ok(code) => debug!("Wrapped command finished with exit code {}", code),
        Err(e) => debug!("Wrapped command failed: {:#}", e),
    }
    outcome
}
