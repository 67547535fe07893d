//! Event loop that owns a [`QueryForm`] and talks to the Answer Service.
//!
//! Keystrokes and submits arrive through a [`FormHandle`]; request completions
//! come back from spawned tasks on an internal channel. Both are applied one at
//! a time on the driver task, and a fresh [`FormSnapshot`] is published after
//! every event.

use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::answer::AnswerShape;
use crate::client::AnswerService;
use crate::errors::AskResult;
use crate::form::{Effect, FormEvent, FormSnapshot, QueryForm, Ticket};

/// The driver task has stopped and no longer accepts events
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("query form is no longer running")]
pub struct FormClosed;

pub struct FormDriver<A, S: ?Sized> {
    form: QueryForm<A>,
    service: Arc<S>,
    events: mpsc::UnboundedReceiver<FormEvent<A>>,
    completions_tx: mpsc::UnboundedSender<(Ticket, AskResult<A>)>,
    completions: mpsc::UnboundedReceiver<(Ticket, AskResult<A>)>,
    snapshots: watch::Sender<FormSnapshot<A>>,
    pending: Option<JoinHandle<()>>,
}

/// Cloneable input side of a running form
pub struct FormHandle<A> {
    events: mpsc::UnboundedSender<FormEvent<A>>,
    snapshots: watch::Receiver<FormSnapshot<A>>,
}

impl<A> Clone for FormHandle<A> {
    fn clone(&self) -> Self {
        Self {
            events: self.events.clone(),
            snapshots: self.snapshots.clone(),
        }
    }
}

impl<A: AnswerShape> FormHandle<A> {
    pub fn change_text(&self, text: impl Into<String>) -> Result<(), FormClosed> {
        self.send(FormEvent::TextChanged(text.into()))
    }

    pub fn submit(&self) -> Result<(), FormClosed> {
        self.send(FormEvent::Submit)
    }

    pub fn unmount(&self) -> Result<(), FormClosed> {
        self.send(FormEvent::Unmount)
    }

    fn send(&self, event: FormEvent<A>) -> Result<(), FormClosed> {
        self.events.send(event).map_err(|_| FormClosed)
    }

    pub fn snapshot(&self) -> FormSnapshot<A> {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<FormSnapshot<A>> {
        self.snapshots.clone()
    }

    /// Waits until at least `revision` events were applied
    pub async fn applied(&self, revision: u64) -> Result<FormSnapshot<A>, FormClosed> {
        let mut rx = self.snapshots.clone();
        let snapshot = rx
            .wait_for(|s| s.revision >= revision)
            .await
            .map_err(|_| FormClosed)?;
        Ok(snapshot.clone())
    }

    /// Waits until at least `revision` events were applied and no request is in flight
    pub async fn settled_after(&self, revision: u64) -> Result<FormSnapshot<A>, FormClosed> {
        let mut rx = self.snapshots.clone();
        let snapshot = rx
            .wait_for(|s| s.revision >= revision && !s.loading)
            .await
            .map_err(|_| FormClosed)?;
        Ok(snapshot.clone())
    }
}

impl<A, S> FormDriver<A, S>
where
    A: AnswerShape,
    S: AnswerService<A> + ?Sized + 'static,
{
    pub fn new(service: Arc<S>) -> (Self, FormHandle<A>) {
        let form = QueryForm::new();
        let (events_tx, events) = mpsc::unbounded_channel();
        let (completions_tx, completions) = mpsc::unbounded_channel();
        let (snapshots, snapshots_rx) = watch::channel(form.snapshot());

        let driver = Self {
            form,
            service,
            events,
            completions_tx,
            completions,
            snapshots,
            pending: None,
        };
        let handle = FormHandle {
            events: events_tx,
            snapshots: snapshots_rx,
        };
        (driver, handle)
    }

    /// Processes events until the form is unmounted or every handle is dropped.
    /// Returns the final state of the form.
    pub async fn run(mut self) -> QueryForm<A> {
        info!(kind = %A::KIND, "Query form mounted");
        loop {
            let event = tokio::select! {
                event = self.events.recv() => event.unwrap_or(FormEvent::Unmount),
                Some((ticket, outcome)) = self.completions.recv() => {
                    FormEvent::Settled { ticket, outcome }
                }
            };
            let unmounting = matches!(event, FormEvent::Unmount);

            let effects = self.form.handle(event);
            for effect in effects {
                self.apply(effect);
            }
            self.snapshots.send_replace(self.form.snapshot());

            if unmounting {
                break;
            }
        }

        if let Some(task) = self.pending.take() {
            debug!("Cancelling request still in flight");
            task.abort();
        }
        info!("Query form unmounted");
        self.form
    }

    fn apply(&mut self, effect: Effect) {
        match effect {
            Effect::SendRequest { ticket, query } => {
                let service = Arc::clone(&self.service);
                let completions = self.completions_tx.clone();
                self.pending = Some(tokio::spawn(async move {
                    let outcome = service.ask(&query).await;
                    // The receiver is gone once the driver stopped
                    let _ = completions.send((ticket, outcome));
                }));
            }
            Effect::FocusInput => {
                debug!("Returning focus to the query input");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::answer::GenericAnswer;
    use crate::errors::AskError;
    use crate::form::Phase;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    /// Answers only after `release` is notified
    struct GatedService {
        calls: AtomicUsize,
        release: Notify,
        fail: bool,
    }

    impl GatedService {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                release: Notify::new(),
                fail,
            })
        }
    }

    #[async_trait]
    impl AnswerService<GenericAnswer> for GatedService {
        async fn ask(&self, query: &str) -> AskResult<GenericAnswer> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.release.notified().await;
            if self.fail {
                Err(AskError::Transport("connection reset".into()))
            } else {
                Ok(GenericAnswer {
                    summary: format!("answer to {}", query),
                    confidence: 0.5,
                })
            }
        }
    }

    #[tokio::test]
    async fn test_rapid_submits_send_one_request() {
        let service = GatedService::new(false);
        let (driver, handle) = FormDriver::<GenericAnswer, _>::new(Arc::clone(&service));
        let task = tokio::spawn(driver.run());

        handle.change_text("x").unwrap();
        handle.submit().unwrap();
        handle.submit().unwrap();

        let mut rx = handle.subscribe();
        let snapshot = rx.wait_for(|s| s.revision >= 3).await.unwrap().clone();
        assert!(snapshot.loading);
        assert_eq!(snapshot.submit_label(), "Thinking...");

        service.release.notify_one();
        let snapshot = handle.settled_after(4).await.unwrap();
        assert_eq!(service.calls.load(Ordering::SeqCst), 1);
        assert_eq!(snapshot.history.len(), 1);
        assert_eq!(snapshot.history[0].summary, "answer to x");
        assert_eq!(snapshot.query, "");
        assert!(snapshot.input_focused);

        handle.unmount().unwrap();
        let form = task.await.unwrap();
        assert!(!form.is_mounted());
    }

    #[tokio::test]
    async fn test_failure_keeps_query() {
        let service = GatedService::new(true);
        let (driver, handle) = FormDriver::<GenericAnswer, _>::new(Arc::clone(&service));
        let task = tokio::spawn(driver.run());

        handle.change_text("Book a table").unwrap();
        handle.submit().unwrap();
        let mut rx = handle.subscribe();
        rx.wait_for(|s| s.loading).await.unwrap();
        service.release.notify_one();

        let snapshot = handle.settled_after(3).await.unwrap();
        assert!(snapshot.history.is_empty());
        assert_eq!(snapshot.query, "Book a table");
        assert!(!snapshot.input_focused);

        drop(handle);
        let form = task.await.unwrap();
        assert!(!form.is_mounted());
    }

    #[tokio::test]
    async fn test_applied_does_not_wait_for_settlement() {
        let service = GatedService::new(false);
        let (driver, handle) = FormDriver::<GenericAnswer, _>::new(Arc::clone(&service));
        let task = tokio::spawn(driver.run());

        handle.change_text("pending").unwrap();
        handle.submit().unwrap();
        let snapshot = handle.applied(2).await.unwrap();
        assert_eq!(snapshot.phase(), Phase::Submitting);
        assert_eq!(snapshot.submit_label(), "Thinking...");

        service.release.notify_one();
        let snapshot = handle.settled_after(2).await.unwrap();
        assert_eq!(snapshot.phase(), Phase::Idle);
        assert_eq!(snapshot.history.len(), 1);

        handle.unmount().unwrap();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_unmount_cancels_pending_request() {
        let service = GatedService::new(false);
        let (driver, handle) = FormDriver::<GenericAnswer, _>::new(Arc::clone(&service));
        let task = tokio::spawn(driver.run());

        handle.change_text("slow").unwrap();
        handle.submit().unwrap();
        let mut rx = handle.subscribe();
        rx.wait_for(|s| s.loading).await.unwrap();

        handle.unmount().unwrap();
        let form = task.await.unwrap();

        assert!(form.history().is_empty());
        assert!(!form.is_loading());
        assert_eq!(handle.submit(), Err(FormClosed));
    }
}
