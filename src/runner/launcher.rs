use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use nix::sys::signal::{SigHandler, Signal, signal};
use std::os::unix::process::ExitStatusExt;
use std::process::{Command, ExitStatus, Stdio};

/// Exit code reported when the wrapped process dies from a signal.
pub const SIGNAL_EXIT_CODE: i32 = 1;

/// Terminal signals the wrapper ignores while the child runs. The child still
/// gets them from the process group and decides how to shut down.
pub const DEFERRED_SIGNALS: [Signal; 3] = [Signal::SIGINT, Signal::SIGTERM, Signal::SIGQUIT];

/// Ignores a set of signals until dropped, then puts the old handlers back.
pub struct SignalGuard {
    saved: Vec<(Signal, SigHandler)>,
}

impl SignalGuard {
    pub fn ignore(signals: &[Signal]) -> Self {
        let mut saved = Vec::with_capacity(signals.len());
        for &sig in signals {
            // Safety: SigIgn installs no handler code, and the previous
            // disposition is restored unchanged in Drop.
            match unsafe { signal(sig, SigHandler::SigIgn) } {
                Ok(previous) => saved.push((sig, previous)),
                Err(e) => warn!("Could not ignore {} while waiting: {}", sig, e),
            }
        }
        debug!("Ignoring {:?} until the child exits", signals);
        Self { saved }
    }
}

impl Drop for SignalGuard {
    fn drop(&mut self) {
        for &(sig, previous) in self.saved.iter().rev() {
            // Safety: restores a disposition previously returned by signal().
            if let Err(e) = unsafe { signal(sig, previous) } {
                warn!("Could not restore handler for {}: {}", sig, e);
            }
        }
    }
}

/// Runs the wrapped command and reports its exit code.
#[cfg_attr(test, mockall::automock)]
pub trait Execute {
    fn execute(&self, args: &[String]) -> Result<i32>;
}

/// Spawns the wrapped binary with inherited stdio, environment and cwd.
pub struct Launcher {
    exec: String,
    dry_run: bool,
}

impl Launcher {
    pub fn new(exec: impl Into<String>) -> Self {
        let exec = exec.into();
        debug!("Initializing process launcher for '{}'", exec);
        Self {
            exec,
            dry_run: false,
        }
    }

    /// Skip spawning and report success instead.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

impl Execute for Launcher {
    fn execute(&self, args: &[String]) -> Result<i32> {
        if self.dry_run {
            info!("Execution disabled, not running '{}' {:?}", self.exec, args);
            return Ok(0);
        }

        info!("Executing: {} {:?}", self.exec, args);

        // Spawn before ignoring anything: SIG_IGN would survive the exec.
        let mut child = Command::new(&self.exec)
            .args(args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| {
                error!("Failed to spawn process '{}': {}", self.exec, e);
                e
            })
            .with_context(|| format!("Failed to run '{}'", self.exec))?;

        debug!("Waiting for '{}' with PID {}", self.exec, child.id());
        let status = {
            let _guard = SignalGuard::ignore(&DEFERRED_SIGNALS);
            child.wait()
        }
        .map_err(|e| {
            error!("Failed waiting on PID {}: {}", child.id(), e);
            e
        })
        .with_context(|| format!("Failed waiting for '{}'", self.exec))?;

        Ok(exit_code(status))
    }
}

/// Map a finished process status to the wrapper's exit code.
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        if status.success() {
            info!("Process completed successfully with exit code: {}", code);
        } else {
            info!("Process exited with non-zero code: {}", code);
        }
        return code;
    }

    match status.signal() {
        Some(sig) => match Signal::try_from(sig) {
            Ok(signal) => info!("Process terminated by signal {}", signal),
            Err(_) => info!("Process terminated by signal {}", sig),
        },
        None => info!("Process ended without an exit code"),
    }
    SIGNAL_EXIT_CODE
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix::sys::signal::raise;
    use serial_test::serial;

    fn sh(script: &str) -> Vec<String> {
        vec!["-c".to_string(), script.to_string()]
    }

    #[test]
    fn passes_exit_code_through() {
        let launcher = Launcher::new("sh");
        assert_eq!(launcher.execute(&sh("exit 0")).unwrap(), 0);
        assert_eq!(launcher.execute(&sh("exit 42")).unwrap(), 42);
    }

    #[test]
    fn signal_maps_to_one() {
        let launcher = Launcher::new("sh");
        assert_eq!(launcher.execute(&sh("kill -9 $$")).unwrap(), SIGNAL_EXIT_CODE);
    }

    #[test]
    fn dry_run_never_spawns() {
        let launcher = Launcher::new("/nonexistent/binary").dry_run(true);
        assert_eq!(launcher.execute(&sh("exit 3")).unwrap(), 0);
    }

    #[test]
    fn missing_binary_is_an_error() {
        let launcher = Launcher::new("/nonexistent/binary");
        let err = launcher.execute(&[]).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/binary"));
    }

    #[test]
    fn raw_status_mapping() {
        assert_eq!(exit_code(ExitStatus::from_raw(7 << 8)), 7);
        assert_eq!(exit_code(ExitStatus::from_raw(15)), SIGNAL_EXIT_CODE);
    }

    #[test]
    #[serial]
    fn guard_ignores_then_restores() {
        {
            let _guard = SignalGuard::ignore(&[Signal::SIGUSR1]);
            // Default action would terminate the test process
            raise(Signal::SIGUSR1).unwrap();
        }

        // Safety: only swaps between default dispositions for SIGUSR1.
        let restored = unsafe { signal(Signal::SIGUSR1, SigHandler::SigDfl) }.unwrap();
        assert_eq!(restored, SigHandler::SigDfl);
    }

    #[test]
    #[serial]
    fn child_still_receives_deferred_signals() {
        let launcher = Launcher::new("sh");
        assert_eq!(launcher.execute(&sh("kill -INT $$")).unwrap(), SIGNAL_EXIT_CODE);
        assert_eq!(launcher.execute(&sh("kill -TERM $$")).unwrap(), SIGNAL_EXIT_CODE);
    }
}
