use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::process::{Child, Command};
use tokio::sync::Mutex;

/// Exit code the child processes use to signal "do not restart me" (registration
/// failure against the cloud, per §4.7). Mirrors the original's sentinel.
pub const REGISTRATION_FAILURE_EXIT_CODE: i32 = 4;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChildState {
    Starting,
    Running,
    Exited(i32),
    Terminated,
}

impl ChildState {
    pub fn is_up(&self) -> bool {
        matches!(self, ChildState::Starting | ChildState::Running)
    }
}

/// One supervised child process. Owns restart/backoff bookkeeping; `supervise` drives
/// the restart loop until `term_event` is set or the child signals a registration
/// failure, at which point it gives up and leaves the last state in place.
pub struct ManagedChild {
    pub name: String,
    program: String,
    args: Vec<String>,
    cooldown: Duration,
    max_backoff: Duration,
    state: Arc<Mutex<ChildState>>,
}

impl ManagedChild {
    pub fn new(name: impl Into<String>, program: impl Into<String>, cooldown: Duration, max_backoff: Duration) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            args: Vec::new(),
            cooldown,
            max_backoff,
            state: Arc::new(Mutex::new(ChildState::Starting)),
        }
    }

    pub fn state_handle(&self) -> Arc<Mutex<ChildState>> {
        self.state.clone()
    }

    async fn spawn(&self) -> anyhow::Result<Child> {
        let child = Command::new(&self.program)
            .args(&self.args)
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| anyhow::anyhow!("failed to spawn {}: {err}", self.program))?;
        log::info!("{} started (pid {:?})", self.name, child.id());
        Ok(child)
    }

    /// Runs until `term_event` flips or the child reports exit code 4. Restarts on any
    /// other exit, with exponential backoff capped at `max_backoff`.
    pub async fn supervise(&self, term_event: Arc<AtomicBool>) -> anyhow::Result<()> {
        let mut backoff = self.cooldown;
        loop {
            if term_event.load(Ordering::SeqCst) {
                return Ok(());
            }

            *self.state.lock().await = ChildState::Starting;
            let mut child = self.spawn().await?;
            *self.state.lock().await = ChildState::Running;
            backoff = self.cooldown;

            let status = tokio::select! {
                status = child.wait() => status,
                _ = wait_for_term(term_event.clone()) => {
                    log::info!("{} terminating on shutdown request", self.name);
                    let _ = child.start_kill();
                    let _ = child.wait().await;
                    *self.state.lock().await = ChildState::Terminated;
                    return Ok(());
                }
            };

            let code = status.ok().and_then(|s| s.code());
            match code {
                Some(0) => {
                    log::info!("{} exited cleanly", self.name);
                    *self.state.lock().await = ChildState::Exited(0);
                }
                Some(REGISTRATION_FAILURE_EXIT_CODE) => {
                    log::error!("{} exited with registration failure, not restarting", self.name);
                    *self.state.lock().await = ChildState::Exited(REGISTRATION_FAILURE_EXIT_CODE);
                    term_event.store(true, Ordering::SeqCst);
                    return Ok(());
                }
                other => {
                    let code = other.unwrap_or(-1);
                    log::warn!("{} exited with code {code}, restarting in {backoff:?}", self.name);
                    *self.state.lock().await = ChildState::Exited(code);
                    tokio::time::sleep(backoff).await;
                    backoff = std::cmp::min(backoff * 2, self.max_backoff);
                }
            }
        }
    }

}

async fn wait_for_term(term_event: Arc<AtomicBool>) {
    while !term_event.load(Ordering::SeqCst) {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}
