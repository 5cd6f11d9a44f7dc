// src/sandbox/finite.rs
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::oneshot;

use super::{ExecutionOutcome, Sandbox};
use crate::errors::{GraderError, Result};

/// Hard wall-clock limit for a single run.
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(60);

/// A single-producer-wins cell. Any number of parties may race to settle it;
/// the first call to [`Settlement::settle`] delivers its value to the
/// receiver and every later call is a no-op that returns `false`.
pub struct Settlement<T> {
    settled: AtomicBool,
    sender: Mutex<Option<oneshot::Sender<T>>>,
}

impl<T> Settlement<T> {
    pub fn channel() -> (Arc<Self>, oneshot::Receiver<T>) {
        let (tx, rx) = oneshot::channel();
        let settlement = Settlement {
            settled: AtomicBool::new(false),
            sender: Mutex::new(Some(tx)),
        };
        (Arc::new(settlement), rx)
    }

    /// Returns `true` if this call won the race.
    pub fn settle(&self, value: T) -> bool {
        // The flag flips before the value becomes visible to the receiver.
        if self
            .settled
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        if let Ok(mut sender) = self.sender.lock() {
            if let Some(tx) = sender.take() {
                let _ = tx.send(value);
            }
        }
        true
    }

    pub fn is_settled(&self) -> bool {
        self.settled.load(Ordering::Acquire)
    }
}

/// Runs source text in a sandbox worker with a hard deadline.
///
/// The worker's reply and the deadline timer race to settle the run. If the
/// timer wins the worker is terminated and the run settles with an
/// "Infinite loop" error; anything the worker sends afterwards is dropped.
#[derive(Clone)]
pub struct FiniteWorker {
    sandbox: Arc<dyn Sandbox>,
    deadline: Duration,
}

impl FiniteWorker {
    pub fn new(sandbox: Arc<dyn Sandbox>) -> Self {
        Self {
            sandbox,
            deadline: DEFAULT_DEADLINE,
        }
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Executes `source` and resolves exactly once.
    pub async fn run(&self, source: &str) -> Result<ExecutionOutcome> {
        let mut worker = self.sandbox.spawn().await?;
        worker.post(source).await?;

        let (settlement, settled) = Settlement::<Result<ExecutionOutcome>>::channel();
        let (terminate_tx, terminate_rx) = oneshot::channel::<()>();

        // Worker path: deliver the reply unless the timer already settled.
        let reply_settlement = Arc::clone(&settlement);
        tokio::spawn(async move {
            tokio::select! {
                reply = worker.recv() => {
                    if !reply_settlement.settle(reply) {
                        log::debug!("Ignoring worker reply that arrived after the deadline");
                        worker.terminate().await;
                    }
                }
                Ok(()) = terminate_rx => {
                    worker.terminate().await;
                    log::debug!("Worker terminated after deadline");
                }
            }
        });

        // Timer path.
        let deadline = self.deadline;
        let timer_settlement = Arc::clone(&settlement);
        let timer = tokio::spawn(async move {
            tokio::time::sleep(deadline).await;
            if timer_settlement.settle(Ok(ExecutionOutcome::timed_out())) {
                log::info!("Run exceeded {:?}, terminating worker", deadline);
                if terminate_tx.send(()).is_err() {
                    log::debug!("Worker task already finished, nothing to terminate");
                }
            }
        });

        let outcome = settled
            .await
            .map_err(|_| GraderError::channel("worker stopped without settling the run"))?;
        if !timer.is_finished() {
            timer.abort();
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::{ExecutionError, SandboxWorker};
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    #[derive(Clone, Copy)]
    enum Behaviour {
        Reply(Duration),
        Hang,
        Fault,
    }

    #[derive(Default)]
    struct Tracker {
        posted: Mutex<Vec<String>>,
        terminated: AtomicUsize,
    }

    struct FakeSandbox {
        behaviour: Behaviour,
        reply: ExecutionOutcome,
        tracker: Arc<Tracker>,
    }

    struct FakeWorker {
        behaviour: Behaviour,
        reply: ExecutionOutcome,
        tracker: Arc<Tracker>,
    }

    #[async_trait]
    impl Sandbox for FakeSandbox {
        async fn spawn(&self) -> Result<Box<dyn SandboxWorker>> {
            Ok(Box::new(FakeWorker {
                behaviour: self.behaviour,
                reply: self.reply.clone(),
                tracker: Arc::clone(&self.tracker),
            }))
        }
    }

    #[async_trait]
    impl SandboxWorker for FakeWorker {
        async fn post(&mut self, source: &str) -> Result<()> {
            self.tracker.posted.lock().unwrap().push(source.to_string());
            Ok(())
        }

        async fn recv(&mut self) -> Result<ExecutionOutcome> {
            match self.behaviour {
                Behaviour::Reply(delay) => {
                    tokio::time::sleep(delay).await;
                    Ok(self.reply.clone())
                }
                Behaviour::Hang => std::future::pending().await,
                Behaviour::Fault => Err(GraderError::Channel {
                    message: "boom".to_string(),
                    filename: Some("worker.py".to_string()),
                    lineno: Some(7),
                }),
            }
        }

        async fn terminate(&mut self) {
            self.tracker.terminated.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn executor(behaviour: Behaviour, deadline: Duration) -> (FiniteWorker, Arc<Tracker>) {
        let tracker = Arc::new(Tracker::default());
        let sandbox = FakeSandbox {
            behaviour,
            reply: ExecutionOutcome::Results("2 passed and 0 failed.".to_string()),
            tracker: Arc::clone(&tracker),
        };
        (
            FiniteWorker::new(Arc::new(sandbox)).with_deadline(deadline),
            tracker,
        )
    }

    #[test]
    fn test_settlement_is_single_shot() {
        let (settlement, mut rx) = Settlement::channel();
        assert!(!settlement.is_settled());
        assert!(settlement.settle(1));
        assert!(!settlement.settle(2));
        assert!(settlement.is_settled());
        assert_eq!(rx.try_recv().unwrap(), 1);
    }

    #[test]
    fn test_settlement_race_has_one_winner() {
        let (settlement, mut rx) = Settlement::channel();
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let s = Arc::clone(&settlement);
                std::thread::spawn(move || s.settle(i))
            })
            .collect();
        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
        assert!(rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_reply_before_deadline() {
        let (worker, tracker) = executor(Behaviour::Reply(Duration::from_millis(5)), Duration::from_secs(5));
        let outcome = worker.run("print(1)").await.unwrap();
        assert_eq!(outcome, ExecutionOutcome::Results("2 passed and 0 failed.".to_string()));
        assert_eq!(tracker.posted.lock().unwrap().as_slice(), ["print(1)".to_string()]);
        assert_eq!(tracker.terminated.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_deadline_terminates_hanging_worker() {
        let (worker, tracker) = executor(Behaviour::Hang, Duration::from_millis(20));
        let outcome = worker.run("while True: pass").await.unwrap();
        assert_eq!(
            outcome,
            ExecutionOutcome::Error(ExecutionError::new("Infinite loop"))
        );

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(tracker.terminated.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_late_reply_is_ignored() {
        let (worker, tracker) = executor(
            Behaviour::Reply(Duration::from_millis(100)),
            Duration::from_millis(10),
        );
        let outcome = worker.run("slow()").await.unwrap();
        assert!(outcome.is_timeout());

        // Give the late reply a chance to arrive; it must not resurrect the run.
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(tracker.terminated.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_channel_fault_is_returned() {
        let (worker, _tracker) = executor(Behaviour::Fault, Duration::from_secs(5));
        match worker.run("x").await {
            Err(GraderError::Channel { filename, lineno, .. }) => {
                assert_eq!(filename.as_deref(), Some("worker.py"));
                assert_eq!(lineno, Some(7));
            }
            other => panic!("expected channel fault, got {:?}", other),
        }
    }
}
