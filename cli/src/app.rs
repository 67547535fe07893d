use anyhow::{anyhow, bail, Context, Result};
use ask_core::form::{INPUT_PLACEHOLDER, SUBMIT_LABEL_LOADING};
use ask_core::{
    AnswerShape, FormDriver, FormEvent, FormHandle, FormSnapshot, HttpAnswerClient, Phase,
    QueryForm, SubmitOutcome,
};
use colored::*;
use crossterm::event::{self, Event as CrosstermEvent, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use dialoguer::Input;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::IsTerminal;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::output::{print_answers, print_header, show_answer};

const HISTORY_COMMAND: &str = ":history";

fn thinking_spinner(label: &str) -> Result<ProgressBar> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
            .template("{spinner} {msg}")?,
    );
    spinner.set_message(label.to_string());
    spinner.enable_steady_tick(Duration::from_millis(120));
    Ok(spinner)
}

/// Runs a single query, prints the answer and fails if none was obtained
pub async fn run_single_query<A: AnswerShape>(
    query: String,
    client: &HttpAnswerClient<A>,
    json: bool,
) -> Result<()> {
    info!("Running single query");

    let mut form = QueryForm::<A>::new();
    form.handle(FormEvent::TextChanged(query));

    let spinner = thinking_spinner(SUBMIT_LABEL_LOADING)?;
    let outcome = form.submit_with(client).await;
    spinner.finish_and_clear();

    match outcome {
        SubmitOutcome::Ignored => bail!("Nothing to ask: the query is empty"),
        SubmitOutcome::Answered => {
            let answer = form
                .history()
                .front()
                .context("Answered submission left no answer in history")?;
            show_answer(answer, json)
        }
        SubmitOutcome::Failed { kind, message } => {
            Err(anyhow!("{:?} failure: {}", kind, message))
        }
    }
}

/// Reads one line of input, pre-filled with whatever the form still holds.
/// `None` means the terminal was closed or interrupted.
fn read_query(initial: String) -> Option<String> {
    match Input::<String>::new()
        .with_prompt(INPUT_PLACEHOLDER)
        .with_initial_text(initial)
        .allow_empty(true)
        .interact_text()
    {
        Ok(line) => Some(line),
        Err(e) => {
            debug!("Input closed: {}", e);
            None
        }
    }
}

fn is_exit(line: &str) -> bool {
    let line = line.trim();
    line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit")
}

/// What one line of interactive input did
#[derive(Debug, PartialEq)]
enum Step<A> {
    Exit,
    History(Vec<A>),
    /// Blank line; nothing was sent
    Ignored,
    Answered(A),
    /// No answer; the form kept this query
    Kept(String),
}

/// A key pressed while a request is pending
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingKey {
    Submit,
    Interrupt,
    Ignore,
}

fn pending_key(event: &CrosstermEvent) -> PendingKey {
    let CrosstermEvent::Key(key) = event else {
        return PendingKey::Ignore;
    };
    if key.kind != KeyEventKind::Press {
        return PendingKey::Ignore;
    }
    match (key.code, key.modifiers) {
        (KeyCode::Enter, _) => PendingKey::Submit,
        (KeyCode::Char('c'), KeyModifiers::CONTROL) => PendingKey::Interrupt,
        _ => PendingKey::Ignore,
    }
}

struct RawMode;

impl RawMode {
    fn enable() -> Result<Self> {
        enable_raw_mode().context("Failed to enable raw mode")?;
        Ok(Self)
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
    }
}

/// Consumes keystrokes until `stop` is set. The input is disabled while a
/// request is pending, so typed text goes nowhere and Enter is reported as a
/// submit for the form to reject.
fn read_pending_keys(stop: &AtomicBool, keys: &mpsc::UnboundedSender<PendingKey>) -> Result<()> {
    let _raw = RawMode::enable()?;
    while !stop.load(Ordering::SeqCst) {
        if !event::poll(Duration::from_millis(50))? {
            continue;
        }
        let key = pending_key(&event::read()?);
        if key != PendingKey::Ignore && keys.send(key).is_err() {
            break;
        }
    }
    Ok(())
}

/// Waits for the request to settle. `None` means the user interrupted.
async fn wait_for_settlement<A: AnswerShape>(
    handle: &FormHandle<A>,
    revision: u64,
    keyboard: bool,
) -> Result<Option<FormSnapshot<A>>> {
    if !keyboard {
        return Ok(Some(handle.settled_after(revision).await?));
    }

    let stop = Arc::new(AtomicBool::new(false));
    let (keys_tx, mut keys) = mpsc::unbounded_channel();
    let reader = tokio::task::spawn_blocking({
        let stop = Arc::clone(&stop);
        move || read_pending_keys(&stop, &keys_tx)
    });

    let settled = handle.settled_after(revision);
    tokio::pin!(settled);
    let result = loop {
        tokio::select! {
            snapshot = &mut settled => break snapshot.map(Some).map_err(Into::into),
            Some(key) = keys.recv() => match key {
                PendingKey::Submit => {
                    debug!("Submit pressed while loading");
                    if let Err(e) = handle.submit() {
                        break Err(e.into());
                    }
                }
                PendingKey::Interrupt => break Ok(None),
                PendingKey::Ignore => {}
            },
        }
    };

    stop.store(true, Ordering::SeqCst);
    if let Err(e) = reader.await.context("Key reader task failed")? {
        warn!("Keystrokes were not captured while loading: {:#}", e);
    }
    result
}

/// Applies one line of input to the form and waits until it took effect.
/// With `keyboard` set, keystrokes made while the request is pending are
/// consumed instead of reaching the next prompt.
async fn run_line<A: AnswerShape>(
    handle: &FormHandle<A>,
    line: String,
    keyboard: bool,
) -> Result<Step<A>> {
    if is_exit(&line) {
        return Ok(Step::Exit);
    }
    if line.trim() == HISTORY_COMMAND {
        return Ok(Step::History(handle.snapshot().history));
    }

    let before = handle.snapshot();
    handle.change_text(line)?;
    handle.submit()?;

    let applied = before.revision + 2;
    let mut after = handle.applied(applied).await?;
    if after.phase() == Phase::Submitting {
        let spinner = thinking_spinner(after.submit_label())?;
        let settled = wait_for_settlement(handle, applied, keyboard).await;
        spinner.finish_and_clear();
        match settled? {
            Some(snapshot) => after = snapshot,
            None => return Ok(Step::Exit),
        }
    }

    if after.history.len() > before.history.len() {
        if let Some(answer) = after.history.first() {
            return Ok(Step::Answered(answer.clone()));
        }
    }
    if after.query.trim().is_empty() {
        Ok(Step::Ignored)
    } else {
        Ok(Step::Kept(after.query))
    }
}

/// Runs an interactive session: one prompt per submission, the answer list
/// growing newest first.
pub async fn run_interactive<A: AnswerShape>(client: HttpAnswerClient<A>, json: bool) -> Result<()> {
    print_header();
    print_answers::<A>(&[], json)?;
    println!("Type 'exit' or 'quit' to end the session.");
    println!();

    let (driver, handle) = FormDriver::<A, _>::new(Arc::new(client));
    let driver_task = tokio::spawn(driver.run());
    let keyboard = std::io::stdin().is_terminal();

    loop {
        // The prompt is only shown while the form is idle, like a disabled input
        let initial = handle.snapshot().query;
        let line = tokio::task::spawn_blocking(move || read_query(initial))
            .await
            .context("Input task failed")?;
        let Some(line) = line else {
            break;
        };

        match run_line(&handle, line, keyboard).await? {
            Step::Exit => {
                println!("Exiting session.");
                break;
            }
            Step::History(history) => {
                print_answers(&history, json)?;
                continue;
            }
            Step::Ignored => {}
            Step::Answered(answer) => show_answer(&answer, json)?,
            Step::Kept(_) => {
                // The failure itself was logged; the text stays for another try
                println!("{}", "No answer. Edit the query or press Enter to retry.".dimmed());
            }
        }

        println!(); // Add spacing between interactions
    }

    handle.unmount()?;
    let form = driver_task.await.context("Query form task failed")?;
    info!("Session ended with {} answers", form.history().len());

    Ok(())
}
