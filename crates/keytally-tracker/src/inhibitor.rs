//! Sleep prevention through a helper subprocess.
//!
//! While active, a platform tool that blocks idle sleep runs as a child
//! process (`caffeinate` on macOS, `systemd-inhibit` on Linux). Deactivating
//! kills it. The [`SleepInhibitor`] owns at most one live child at a time.

use std::fmt;
use std::io;
use std::process::{Child, Command, Stdio};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, info, warn};

/// A running inhibitor subprocess.
pub trait InhibitorProcess: Send + fmt::Debug {
    /// Whether the process is still running.
    fn is_alive(&mut self) -> bool;

    /// Stop the process and reap it.
    fn terminate(&mut self) -> io::Result<()>;
}

/// Starts inhibitor subprocesses.
pub trait InhibitorLauncher: Send + fmt::Debug {
    /// Spawn a new inhibitor process.
    ///
    /// # Errors
    ///
    /// Returns the spawn error, or `Unsupported` where no inhibitor tool is
    /// known.
    fn launch(&self) -> io::Result<Box<dyn InhibitorProcess>>;
}

/// Launcher running an external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLauncher {
    program: String,
    args: Vec<String>,
}

impl CommandLauncher {
    pub fn new(program: impl Into<String>, args: &[&str]) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// The inhibitor command for the current OS, if there is one.
    pub fn platform_default() -> Option<Self> {
        if cfg!(target_os = "macos") {
            Some(Self::new("caffeinate", &["-dimsu"]))
        } else if cfg!(target_os = "linux") {
            Some(Self::new(
                "systemd-inhibit",
                &[
                    "--what=idle:sleep",
                    "--who=keytally",
                    "--why=Time tracking",
                    "sleep",
                    "infinity",
                ],
            ))
        } else {
            None
        }
    }
}

impl InhibitorLauncher for CommandLauncher {
    fn launch(&self) -> io::Result<Box<dyn InhibitorProcess>> {
        let child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        debug!(program = %self.program, pid = child.id(), "Inhibitor spawned");
        Ok(Box::new(ChildProcess(child)))
    }
}

/// Launcher for platforms without an inhibitor tool.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsupportedLauncher;

impl InhibitorLauncher for UnsupportedLauncher {
    fn launch(&self) -> io::Result<Box<dyn InhibitorProcess>> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "no sleep inhibitor available on this platform",
        ))
    }
}

#[derive(Debug)]
struct ChildProcess(Child);

impl InhibitorProcess for ChildProcess {
    fn is_alive(&mut self) -> bool {
        matches!(self.0.try_wait(), Ok(None))
    }

    fn terminate(&mut self) -> io::Result<()> {
        match self.0.kill() {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::InvalidInput => {}
            Err(e) => return Err(e),
        }
        self.0.wait().map(|_| ())
    }
}

/// Owner of the inhibitor subprocess.
///
/// A child that exits on its own is reaped the next time the inhibitor is
/// queried, so [`is_active`](Self::is_active) never reports a dead process.
#[derive(Debug)]
pub struct SleepInhibitor {
    launcher: Box<dyn InhibitorLauncher>,
    process: Mutex<Option<Box<dyn InhibitorProcess>>>,
}

impl SleepInhibitor {
    pub fn new(launcher: Box<dyn InhibitorLauncher>) -> Self {
        Self {
            launcher,
            process: Mutex::new(None),
        }
    }

    /// Inhibitor using the current platform's tool.
    pub fn platform_default() -> Self {
        match CommandLauncher::platform_default() {
            Some(launcher) => Self::new(Box::new(launcher)),
            None => Self::new(Box::new(UnsupportedLauncher)),
        }
    }

    /// Whether an inhibitor process is running.
    pub fn is_active(&self) -> bool {
        let mut process = self.process.lock().unwrap_or_else(PoisonError::into_inner);
        reap_exited(&mut process);
        process.is_some()
    }

    /// Make sure an inhibitor is running.
    ///
    /// Does not spawn a second process while one is alive. Returns whether
    /// an inhibitor is running afterwards.
    pub fn enable(&mut self) -> bool {
        let process = self.process.get_mut().unwrap_or_else(PoisonError::into_inner);
        reap_exited(process);
        if process.is_some() {
            return true;
        }

        match self.launcher.launch() {
            Ok(launched) => {
                info!("Sleep prevention on");
                *process = Some(launched);
                true
            }
            Err(e) => {
                warn!(error = %e, "Cannot start sleep prevention");
                false
            }
        }
    }

    /// Stop the inhibitor if one is running.
    pub fn disable(&mut self) {
        let process = self.process.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(mut process) = process.take() {
            match process.terminate() {
                Ok(()) => info!("Sleep prevention off"),
                Err(e) => warn!(error = %e, "Stopping sleep prevention failed"),
            }
        }
    }

    /// Flip the inhibitor; returns whether it is active afterwards.
    pub fn toggle(&mut self) -> bool {
        if self.is_active() {
            self.disable();
            false
        } else {
            self.enable()
        }
    }
}

fn reap_exited(slot: &mut Option<Box<dyn InhibitorProcess>>) {
    let Some(process) = slot.as_mut() else {
        return;
    };
    if process.is_alive() {
        return;
    }

    warn!("Inhibitor exited on its own");
    if let Err(e) = process.terminate() {
        debug!(error = %e, "Reaping exited inhibitor failed");
    }
    *slot = None;
}

impl Drop for SleepInhibitor {
    fn drop(&mut self) {
        self.disable();
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Launcher tracking how many fake processes are alive.
    #[derive(Debug, Clone, Default)]
    pub struct FakeLauncher {
        pub live: Arc<AtomicUsize>,
        pub launched: Arc<AtomicUsize>,
        pub fail: Arc<AtomicBool>,
        crashed: Arc<AtomicUsize>,
    }

    #[derive(Debug)]
    struct FakeProcess {
        id: usize,
        live: Arc<AtomicUsize>,
        crashed: Arc<AtomicUsize>,
        alive: bool,
    }

    impl InhibitorProcess for FakeProcess {
        fn is_alive(&mut self) -> bool {
            if self.alive && self.id <= self.crashed.load(Ordering::SeqCst) {
                self.alive = false;
                self.live.fetch_sub(1, Ordering::SeqCst);
            }
            self.alive
        }

        fn terminate(&mut self) -> io::Result<()> {
            if self.alive {
                self.alive = false;
                self.live.fetch_sub(1, Ordering::SeqCst);
            }
            Ok(())
        }
    }

    impl InhibitorLauncher for FakeLauncher {
        fn launch(&self) -> io::Result<Box<dyn InhibitorProcess>> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(io::Error::new(io::ErrorKind::NotFound, "caffeinate"));
            }
            self.live.fetch_add(1, Ordering::SeqCst);
            let id = self.launched.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(Box::new(FakeProcess {
                id,
                live: Arc::clone(&self.live),
                crashed: Arc::clone(&self.crashed),
                alive: true,
            }))
        }
    }

    impl FakeLauncher {
        pub fn live(&self) -> usize {
            self.live.load(Ordering::SeqCst)
        }

        pub fn launched(&self) -> usize {
            self.launched.load(Ordering::SeqCst)
        }

        /// Make every process launched so far exit on its own.
        pub fn crash_all(&self) {
            self.crashed
                .store(self.launched.load(Ordering::SeqCst), Ordering::SeqCst);
        }
    }
}
