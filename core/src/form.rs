//! State container for the query form.
//!
//! `QueryForm` owns the current query text, the answer history and the loading
//! flag. Every change goes through [`QueryForm::handle`], which applies one
//! event and returns the effects the caller has to carry out. The form never
//! performs I/O itself; [`QueryForm::submit_with`] and the
//! [`driver`](crate::driver) wire it to an [`AnswerService`].

use std::collections::VecDeque;
use std::fmt;
use tracing::{debug, error, info};

use crate::answer::AnswerShape;
use crate::client::AnswerService;
use crate::errors::{AskResult, FailureKind};

pub const SUBMIT_LABEL: &str = "Ask";
pub const SUBMIT_LABEL_LOADING: &str = "Thinking...";
pub const INPUT_PLACEHOLDER: &str = "Type your query here...";

/// Identifies one accepted submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket(u64);

impl fmt::Display for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug)]
pub enum FormEvent<A> {
    /// Raw input from the text field, stored verbatim
    TextChanged(String),
    Submit,
    /// The request for `ticket` finished
    Settled { ticket: Ticket, outcome: AskResult<A> },
    /// The view is being torn down; pending completions are dropped
    Unmount,
}

/// Work the owner of the form has to perform after an event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    SendRequest { ticket: Ticket, query: String },
    FocusInput,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Submitting,
}

/// Result of a full submit cycle driven by [`QueryForm::submit_with`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Empty query or a request already in flight; nothing was sent
    Ignored,
    Answered,
    Failed { kind: FailureKind, message: String },
}

/// Point-in-time copy of the form, handed to renderers
#[derive(Debug, Clone, PartialEq)]
pub struct FormSnapshot<A> {
    pub query: String,
    /// Newest first
    pub history: Vec<A>,
    pub loading: bool,
    pub input_focused: bool,
    /// Number of events applied so far
    pub revision: u64,
}

impl<A> FormSnapshot<A> {
    pub fn phase(&self) -> Phase {
        if self.loading {
            Phase::Submitting
        } else {
            Phase::Idle
        }
    }

    pub fn submit_label(&self) -> &'static str {
        if self.loading {
            SUBMIT_LABEL_LOADING
        } else {
            SUBMIT_LABEL
        }
    }
}

#[derive(Debug)]
pub struct QueryForm<A> {
    query: String,
    history: VecDeque<A>,
    loading: bool,
    in_flight: Option<Ticket>,
    next_ticket: u64,
    input_focused: bool,
    mounted: bool,
    revision: u64,
}

impl<A> Default for QueryForm<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> QueryForm<A> {
    pub fn new() -> Self {
        Self {
            query: String::new(),
            history: VecDeque::new(),
            loading: false,
            in_flight: None,
            next_ticket: 0,
            input_focused: true,
            mounted: true,
            revision: 0,
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Answers received so far, newest first
    pub fn history(&self) -> &VecDeque<A> {
        &self.history
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn phase(&self) -> Phase {
        if self.loading {
            Phase::Submitting
        } else {
            Phase::Idle
        }
    }

    /// The text field and submit control are disabled while loading
    pub fn input_focused(&self) -> bool {
        self.input_focused
    }

    pub fn submit_label(&self) -> &'static str {
        if self.loading {
            SUBMIT_LABEL_LOADING
        } else {
            SUBMIT_LABEL
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn in_flight(&self) -> Option<Ticket> {
        self.in_flight
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }
}

impl<A: AnswerShape> QueryForm<A> {
    /// Applies one event and returns the effects it requires.
    ///
    /// Each call runs to completion before the next event is looked at, so the
    /// success and failure branches of a settlement are atomic with respect to
    /// keystrokes and submits.
    pub fn handle(&mut self, event: FormEvent<A>) -> Vec<Effect> {
        self.revision += 1;

        if !self.mounted {
            debug!("Form is unmounted, dropping event");
            return Vec::new();
        }

        match event {
            FormEvent::TextChanged(text) => {
                if self.loading {
                    debug!("Input is disabled while a request is in flight");
                    return Vec::new();
                }
                self.query = text;
                Vec::new()
            }
            FormEvent::Submit => self.begin_submit(),
            FormEvent::Settled { ticket, outcome } => self.settle(ticket, outcome),
            FormEvent::Unmount => {
                if let Some(ticket) = self.in_flight.take() {
                    debug!(%ticket, "Unmounting with a request in flight");
                }
                self.loading = false;
                self.mounted = false;
                self.input_focused = false;
                Vec::new()
            }
        }
    }

    fn begin_submit(&mut self) -> Vec<Effect> {
        let query = self.query.trim();
        if query.is_empty() {
            debug!("Ignoring submit of empty query");
            return Vec::new();
        }
        if self.loading {
            debug!("Ignoring submit while a request is in flight");
            return Vec::new();
        }

        let ticket = Ticket(self.next_ticket);
        self.next_ticket += 1;
        self.loading = true;
        self.in_flight = Some(ticket);
        // A disabled field cannot hold focus
        self.input_focused = false;

        info!(%ticket, "Submitting query");
        vec![Effect::SendRequest {
            ticket,
            query: query.to_string(),
        }]
    }

    fn settle(&mut self, ticket: Ticket, outcome: AskResult<A>) -> Vec<Effect> {
        if self.in_flight != Some(ticket) {
            debug!(%ticket, "Ignoring completion for a request that is no longer in flight");
            return Vec::new();
        }
        self.in_flight = None;
        self.loading = false;

        match outcome {
            Ok(answer) => {
                self.history.push_front(answer);
                self.query.clear();
                self.input_focused = true;
                vec![Effect::FocusInput]
            }
            Err(e) => {
                error!(%ticket, kind = ?e.kind(), "Answer request failed: {}", e);
                Vec::new()
            }
        }
    }

    pub fn snapshot(&self) -> FormSnapshot<A> {
        FormSnapshot {
            query: self.query.clone(),
            history: self.history.iter().cloned().collect(),
            loading: self.loading,
            input_focused: self.input_focused,
            revision: self.revision,
        }
    }

    /// Runs one whole submit cycle against `service`: submit, await the
    /// request, settle.
    pub async fn submit_with<S>(&mut self, service: &S) -> SubmitOutcome
    where
        S: AnswerService<A> + ?Sized,
    {
        let request = self.handle(FormEvent::Submit).into_iter().find_map(|effect| match effect {
            Effect::SendRequest { ticket, query } => Some((ticket, query)),
            Effect::FocusInput => None,
        });
        let Some((ticket, query)) = request else {
            return SubmitOutcome::Ignored;
        };

        let outcome = service.ask(&query).await;
        let result = match &outcome {
            Ok(_) => SubmitOutcome::Answered,
            Err(e) => SubmitOutcome::Failed {
                kind: e.kind(),
                message: e.to_string(),
            },
        };
        self.handle(FormEvent::Settled { ticket, outcome });
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::answer::GenericAnswer;
    use crate::errors::AskError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    fn answer(summary: &str, confidence: f64) -> GenericAnswer {
        GenericAnswer {
            summary: summary.to_string(),
            confidence,
        }
    }

    fn typed(text: &str) -> QueryForm<GenericAnswer> {
        let mut form = QueryForm::new();
        form.handle(FormEvent::TextChanged(text.to_string()));
        form
    }

    fn sent(effects: Vec<Effect>) -> (Ticket, String) {
        match effects.as_slice() {
            [Effect::SendRequest { ticket, query }] => (*ticket, query.clone()),
            other => panic!("expected a single request, got {:?}", other),
        }
    }

    /// Records queries and replays canned outcomes
    struct ScriptedService {
        calls: Mutex<Vec<String>>,
        outcomes: Mutex<Vec<AskResult<GenericAnswer>>>,
    }

    impl ScriptedService {
        fn new(outcomes: Vec<AskResult<GenericAnswer>>) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                outcomes: Mutex::new(outcomes),
            }
        }
    }

    #[async_trait]
    impl AnswerService<GenericAnswer> for ScriptedService {
        async fn ask(&self, query: &str) -> AskResult<GenericAnswer> {
            self.calls.lock().unwrap().push(query.to_string());
            self.outcomes.lock().unwrap().remove(0)
        }
    }

    #[test]
    fn test_text_change_is_verbatim() {
        let form = typed("  spaced  ");
        assert_eq!(form.query(), "  spaced  ");
    }

    #[test]
    fn test_submit_trims_and_sets_loading() {
        let mut form = typed("  What is the capital of France?  ");
        let (_, query) = sent(form.handle(FormEvent::Submit));

        assert_eq!(query, "What is the capital of France?");
        assert!(form.is_loading());
        assert_eq!(form.phase(), Phase::Submitting);
        assert_eq!(form.submit_label(), SUBMIT_LABEL_LOADING);
        // Query keeps the raw text until success
        assert_eq!(form.query(), "  What is the capital of France?  ");
    }

    #[test]
    fn test_blank_submit_is_noop() {
        for text in ["", "   ", "\t\n"] {
            let mut form = typed(text);
            let effects = form.handle(FormEvent::Submit);
            assert!(effects.is_empty());
            assert!(!form.is_loading());
            assert_eq!(form.query(), text);
            assert!(form.history().is_empty());
            assert_eq!(form.in_flight(), None);
        }
    }

    #[test]
    fn test_submit_while_loading_is_noop() {
        let mut form = typed("x");
        let (ticket, _) = sent(form.handle(FormEvent::Submit));

        assert!(form.handle(FormEvent::Submit).is_empty());
        assert_eq!(form.in_flight(), Some(ticket));
    }

    #[test]
    fn test_success_prepends_and_clears() {
        let mut form = typed("first");
        let (ticket, _) = sent(form.handle(FormEvent::Submit));
        let effects = form.handle(FormEvent::Settled {
            ticket,
            outcome: Ok(answer("one", 0.5)),
        });
        assert_eq!(effects, vec![Effect::FocusInput]);

        form.handle(FormEvent::TextChanged("second".to_string()));
        let (ticket, _) = sent(form.handle(FormEvent::Submit));
        form.handle(FormEvent::Settled {
            ticket,
            outcome: Ok(answer("two", 0.9)),
        });

        let history: Vec<_> = form.history().iter().cloned().collect();
        assert_eq!(history, vec![answer("two", 0.9), answer("one", 0.5)]);
        assert_eq!(form.query(), "");
        assert!(!form.is_loading());
        assert!(form.input_focused());
        assert_eq!(form.submit_label(), SUBMIT_LABEL);
    }

    #[test]
    fn test_failure_preserves_state() {
        let failures = vec![
            AskError::Transport("connection refused".into()),
            AskError::Status {
                status_code: 500,
                message: "boom".into(),
            },
            AskError::MalformedPayload("missing field `summary`".into()),
        ];

        for failure in failures {
            let mut form = typed("Book a table");
            let (ticket, _) = sent(form.handle(FormEvent::Submit));
            form.handle(FormEvent::Settled {
                ticket,
                outcome: Err(failure),
            });

            assert!(form.history().is_empty());
            assert_eq!(form.query(), "Book a table");
            assert!(!form.is_loading());
            assert_eq!(form.phase(), Phase::Idle);
        }
    }

    #[test]
    fn test_form_is_reusable_after_failure() {
        let mut form = typed("retry me");
        let (ticket, _) = sent(form.handle(FormEvent::Submit));
        form.handle(FormEvent::Settled {
            ticket,
            outcome: Err(AskError::Transport("reset".into())),
        });

        let (retry, query) = sent(form.handle(FormEvent::Submit));
        assert_ne!(retry, ticket);
        assert_eq!(query, "retry me");
    }

    #[test]
    fn test_typing_ignored_while_loading() {
        let mut form = typed("x");
        sent(form.handle(FormEvent::Submit));
        form.handle(FormEvent::TextChanged("y".to_string()));
        assert_eq!(form.query(), "x");
    }

    #[test]
    fn test_stale_completion_ignored() {
        let mut form = typed("x");
        let (ticket, _) = sent(form.handle(FormEvent::Submit));
        form.handle(FormEvent::Settled {
            ticket,
            outcome: Err(AskError::Transport("reset".into())),
        });

        // A duplicate completion for a settled ticket changes nothing
        form.handle(FormEvent::Settled {
            ticket,
            outcome: Ok(answer("late", 1.0)),
        });
        assert!(form.history().is_empty());
        assert_eq!(form.query(), "x");
    }

    #[test]
    fn test_unmount_drops_late_completion() {
        let mut form = typed("x");
        let (ticket, _) = sent(form.handle(FormEvent::Submit));
        form.handle(FormEvent::Unmount);

        assert!(!form.is_mounted());
        assert!(!form.is_loading());
        assert_eq!(form.in_flight(), None);

        let effects = form.handle(FormEvent::Settled {
            ticket,
            outcome: Ok(answer("late", 1.0)),
        });
        assert!(effects.is_empty());
        assert!(form.history().is_empty());
        assert!(form.handle(FormEvent::Submit).is_empty());
    }

    #[test]
    fn test_snapshot_reflects_state() {
        let mut form = typed("q");
        let snapshot = form.snapshot();
        assert_eq!(snapshot.query, "q");
        assert_eq!(snapshot.revision, 1);
        assert_eq!(snapshot.phase(), Phase::Idle);
        assert_eq!(snapshot.submit_label(), SUBMIT_LABEL);

        sent(form.handle(FormEvent::Submit));
        let snapshot = form.snapshot();
        assert!(snapshot.loading);
        assert_eq!(snapshot.phase(), Phase::Submitting);
        assert_eq!(snapshot.submit_label(), SUBMIT_LABEL_LOADING);
        assert_eq!(snapshot.revision, 2);
    }

    #[tokio::test]
    async fn test_submit_with_success() {
        let service = ScriptedService::new(vec![Ok(answer("Paris", 0.97))]);
        let mut form = typed("  What is the capital of France?  ");

        let outcome = form.submit_with(&service).await;

        assert_eq!(outcome, SubmitOutcome::Answered);
        assert_eq!(
            *service.calls.lock().unwrap(),
            vec!["What is the capital of France?".to_string()]
        );
        assert_eq!(form.history().front(), Some(&answer("Paris", 0.97)));
        assert_eq!(form.query(), "");
        assert!(!form.is_loading());
    }

    #[tokio::test]
    async fn test_submit_with_failure() {
        let service = ScriptedService::new(vec![Err(AskError::Status {
            status_code: 500,
            message: "Request failed: boom".into(),
        })]);
        let mut form = typed("Book a table");

        let outcome = form.submit_with(&service).await;

        assert!(matches!(
            outcome,
            SubmitOutcome::Failed {
                kind: FailureKind::ServerReported,
                ..
            }
        ));
        assert!(form.history().is_empty());
        assert_eq!(form.query(), "Book a table");
        assert!(!form.is_loading());
    }

    #[tokio::test]
    async fn test_submit_with_blank_sends_nothing() {
        let service = ScriptedService::new(Vec::new());
        let mut form = typed("   ");

        assert_eq!(form.submit_with(&service).await, SubmitOutcome::Ignored);
        assert!(service.calls.lock().unwrap().is_empty());
    }
}
