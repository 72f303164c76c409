//! Named, independently running step sequences.

use crate::cmd::{Cmd, Cmdr};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, Notify};
use tokio::time::Duration;

/// One step sequence: a cycle of command batches, optionally dwelling on
/// a step via a `wait <duration>` command within that step.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Chase {
    pub text: String,
    pub steps: Vec<Vec<Cmd>>,
}

/// A saved sequence of `{ cue, chase }` calls, grouped for a dashboard
/// "run the whole show" button.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Call {
    pub cue: String,
    pub chase: String,
}

/// A sheet is a named group of parallel call groups.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Sheet {
    pub text: String,
    pub group: Vec<Vec<Call>>,
}

/// Runs named chases, each as its own background task, against a shared
/// commander. At most one task runs per chase name; starting an
/// already-running chase is a no-op, matching the original's behavior.
pub struct Chaser {
    inner: Arc<dyn Cmdr>,
    chases: HashMap<String, Chase>,
    running: Mutex<HashMap<String, (tokio::task::JoinHandle<()>, Arc<Notify>)>>,
    errs: mpsc::Sender<String>,
}

impl Chaser {
    /// Builds a `Chaser` and returns it alongside the receiving half of
    /// its error channel, onto which step-wait parse errors and command
    /// errors are reported without interrupting the running chase.
    pub fn new(inner: Arc<dyn Cmdr>, chases: HashMap<String, Chase>) -> (Chaser, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(64);
        (
            Chaser {
                inner,
                chases,
                running: Mutex::new(HashMap::new()),
                errs: tx,
            },
            rx,
        )
    }

    /// Starts running the named chase, looping its steps forever until
    /// stopped. No-op if `name` isn't a known chase or is already
    /// running.
    pub async fn chase(&self, name: &str) {
        let Some(chase) = self.chases.get(name).cloned() else {
            return;
        };

        let mut running = self.running.lock().await;
        if running.contains_key(name) {
            return;
        }

        let inner = self.inner.clone();
        let errs = self.errs.clone();
        let name_owned = name.to_string();
        let stop = Arc::new(Notify::new());
        let stop_rx = stop.clone();
        let handle = tokio::spawn(async move {
            let mut step = 0usize;
            let mut wait = Duration::ZERO;
            loop {
                if chase.steps.is_empty() {
                    return;
                }
                // only observed between steps -- an in-flight cmd always
                // finishes once started, matching the original's select
                // at the top of the loop rather than mid-command.
                tokio::select! {
                    _ = tokio::time::sleep(wait) => {}
                    _ = stop_rx.notified() => return,
                }

                let steps = &chase.steps[step % chase.steps.len()];
                wait = Duration::ZERO;
                for cmd in steps {
                    if cmd.action == "wait" {
                        match crate::cmd::parse_duration_str(&cmd.target) {
                            Ok(d) => wait = d,
                            Err(e) => {
                                let _ = errs
                                    .send(format!("chase {name_owned} step {step} wait: {e}"))
                                    .await;
                            }
                        }
                    }
                }

                if let Err(e) = inner.cmd(steps.clone()).await {
                    let _ = errs.send(format!("chase {name_owned} step {step}: {e}")).await;
                }

                step = step.wrapping_add(1);
            }
        });
        running.insert(name.to_string(), (handle, stop));
    }

    /// Stops the named chase if running. The running step, if any, is
    /// allowed to finish; only the dwell before the next step is cut
    /// short.
    pub async fn stop(&self, name: &str) {
        let entry = self.running.lock().await.remove(name);
        if let Some((handle, stop)) = entry {
            stop.notify_one();
            let _ = handle.await;
        }
    }

    /// Stops every running chase, each allowed to finish its current step.
    pub async fn stop_all(&self) {
        let entries: Vec<_> = self.running.lock().await.drain().collect();
        for (_, (handle, stop)) in entries {
            stop.notify_one();
            let _ = handle.await;
        }
    }

    /// Names of currently running chases.
    pub async fn chasing(&self) -> Vec<String> {
        self.running.lock().await.keys().cloned().collect()
    }
}
