#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::anyhow;
use gatedag::engine::{ExecutionNotifier, TaskFailure};
use gatedag::task::{Work, WorkFuture};
use tokio::sync::watch;

/// What a probe work unit did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkEvent {
    Started(String),
    Finished(String),
}

#[derive(Default)]
struct LogInner {
    events: Vec<WorkEvent>,
    running: usize,
    max_running: usize,
}

/// Shared record of probe work units: start/finish order and the highest
/// number of them running at once.
#[derive(Clone, Default)]
pub struct ExecutionLog {
    inner: Arc<Mutex<LogInner>>,
}

impl ExecutionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Work that records itself, sleeps a few milliseconds and succeeds.
    pub fn work(&self, name: &str) -> Arc<dyn Work> {
        self.work_with_delay(name, Duration::from_millis(5))
    }

    pub fn work_with_delay(&self, name: &str, delay: Duration) -> Arc<dyn Work> {
        Arc::new(ProbeWork {
            name: name.to_string(),
            log: self.clone(),
            behaviour: Behaviour::Succeed(delay),
        })
    }

    /// Work that records itself and then returns an error with `message`.
    pub fn failing_work(&self, name: &str, message: &str) -> Arc<dyn Work> {
        Arc::new(ProbeWork {
            name: name.to_string(),
            log: self.clone(),
            behaviour: Behaviour::Fail(message.to_string()),
        })
    }

    /// Work that records its start and then waits until `gate` opens.
    pub fn gated_work(&self, name: &str, gate: &Gate) -> Arc<dyn Work> {
        Arc::new(ProbeWork {
            name: name.to_string(),
            log: self.clone(),
            behaviour: Behaviour::WaitFor(gate.clone()),
        })
    }

    /// Work whose future panics after recording its start.
    pub fn panicking_work(&self, name: &str) -> Arc<dyn Work> {
        Arc::new(ProbeWork {
            name: name.to_string(),
            log: self.clone(),
            behaviour: Behaviour::Panic,
        })
    }

    pub fn events(&self) -> Vec<WorkEvent> {
        self.inner.lock().unwrap().events.clone()
    }

    /// Names in the order their work started.
    pub fn started(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                WorkEvent::Started(name) => Some(name),
                WorkEvent::Finished(_) => None,
            })
            .collect()
    }

    /// Names in the order their work finished successfully.
    pub fn finished(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                WorkEvent::Finished(name) => Some(name),
                WorkEvent::Started(_) => None,
            })
            .collect()
    }

    pub fn ran(&self, name: &str) -> bool {
        self.started().iter().any(|n| n == name)
    }

    /// True if `first` finished before `second` started.
    pub fn finished_before_started(&self, first: &str, second: &str) -> bool {
        let events = self.events();
        let finished = events
            .iter()
            .position(|e| *e == WorkEvent::Finished(first.to_string()));
        let started = events
            .iter()
            .position(|e| *e == WorkEvent::Started(second.to_string()));
        matches!((finished, started), (Some(f), Some(s)) if f < s)
    }

    pub fn max_concurrency(&self) -> usize {
        self.inner.lock().unwrap().max_running
    }

    fn start(&self, name: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.events.push(WorkEvent::Started(name.to_string()));
        inner.running += 1;
        inner.max_running = inner.max_running.max(inner.running);
    }

    fn stop(&self, name: &str, success: bool) {
        let mut inner = self.inner.lock().unwrap();
        if success {
            inner.events.push(WorkEvent::Finished(name.to_string()));
        }
        inner.running -= 1;
    }
}

/// A latch that gated probe work waits on.
#[derive(Clone)]
pub struct Gate {
    tx: Arc<watch::Sender<bool>>,
}

impl Gate {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn open(&self) {
        self.tx.send_replace(true);
    }

    async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        let _ = rx.wait_for(|open| *open).await;
    }
}

impl Default for Gate {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone)]
enum Behaviour {
    Succeed(Duration),
    Fail(String),
    WaitFor(Gate),
    Panic,
}

struct ProbeWork {
    name: String,
    log: ExecutionLog,
    behaviour: Behaviour,
}

impl Work for ProbeWork {
    fn perform(&self) -> WorkFuture {
        let name = self.name.clone();
        let log = self.log.clone();
        let behaviour = self.behaviour.clone();

        Box::pin(async move {
            log.start(&name);
            match behaviour {
                Behaviour::Succeed(delay) => {
                    tokio::time::sleep(delay).await;
                    log.stop(&name, true);
                    Ok(())
                }
                Behaviour::Fail(message) => {
                    log.stop(&name, false);
                    Err(anyhow!(message))
                }
                Behaviour::WaitFor(gate) => {
                    gate.wait().await;
                    log.stop(&name, true);
                    Ok(())
                }
                Behaviour::Panic => {
                    log.stop(&name, false);
                    panic!("probe work '{name}' panicked");
                }
            }
        })
    }

    fn describe(&self) -> String {
        format!("probe:{}", self.name)
    }
}

/// Lifecycle notifications as seen by an observer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Starting(String),
    Failed(String, String),
    Complete(String),
}

/// Observer that records every notification it receives.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    seen: Arc<Mutex<Vec<Notification>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.seen.lock().unwrap().clone()
    }

    /// Notifications for one task, in delivery order.
    pub fn for_task(&self, task: &str) -> Vec<Notification> {
        self.notifications()
            .into_iter()
            .filter(|n| match n {
                Notification::Starting(t) | Notification::Complete(t) => t == task,
                Notification::Failed(t, _) => t == task,
            })
            .collect()
    }
}

impl ExecutionNotifier for RecordingNotifier {
    fn on_starting(&self, task: &str) {
        self.seen
            .lock()
            .unwrap()
            .push(Notification::Starting(task.to_string()));
    }

    fn on_complete(&self, task: &str) {
        self.seen
            .lock()
            .unwrap()
            .push(Notification::Complete(task.to_string()));
    }

    fn on_failed(&self, task: &str, error: &TaskFailure) {
        self.seen
            .lock()
            .unwrap()
            .push(Notification::Failed(task.to_string(), format!("{error:#}")));
    }
}
