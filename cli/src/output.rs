use ask_core::AnswerShape;
use colored::*;

pub const TITLE: &str = "Hello Ask Anything";
pub const EMPTY_HISTORY: &str = "No answers yet. Ask a question below!";

/// Print the page title shown when interactive mode starts
pub fn print_header() {
    println!("{}", TITLE.bright_cyan().bold());
    println!();
}

/// Plain-text lines of one answer: the heading, then indented details
pub fn answer_lines<A: AnswerShape>(answer: &A) -> Vec<String> {
    let mut lines = answer.render_lines().into_iter();
    let mut out = Vec::new();
    if let Some(heading) = lines.next() {
        out.push(heading);
    }
    out.extend(lines.map(|line| format!("  {}", line)));
    out
}

/// Print one answer, heading highlighted
pub fn print_answer<A: AnswerShape>(answer: &A) {
    for (i, line) in answer_lines(answer).into_iter().enumerate() {
        if i == 0 {
            println!("{} {}", "•".yellow(), line.bold());
        } else {
            println!("{}", line.dimmed());
        }
    }
}

/// Print one answer as a JSON document
pub fn print_answer_json<A: AnswerShape>(answer: &A) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(answer)?);
    Ok(())
}

/// Print one answer in the selected output format
pub fn show_answer<A: AnswerShape>(answer: &A, json: bool) -> anyhow::Result<()> {
    if json {
        print_answer_json(answer)
    } else {
        print_answer(answer);
        Ok(())
    }
}

/// The whole history as one JSON array, newest first
pub fn history_json<A: AnswerShape>(history: &[A]) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(history)?)
}

/// Print the whole answer history, newest first
pub fn print_answers<A: AnswerShape>(history: &[A], json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", history_json(history)?);
        return Ok(());
    }

    println!("{}", "Answers".cyan().bold());
    if history.is_empty() {
        println!("{}", EMPTY_HISTORY.dimmed());
    } else {
        for answer in history {
            show_answer(answer, false)?;
        }
    }
    println!();
    Ok(())
}

/// Show usage instructions when no query or action is provided
pub fn print_usage_instructions() {
    println!("{}", "Usage:".yellow().bold());
    println!("  {}", "ask \"your question\"".green().bold());
    println!("    Send a single query to the Answer Service");
    println!();
    println!("  {}", "ask -i".green().bold());
    println!("    Start an interactive session; type 'exit' or 'quit' to leave,");
    println!("    ':history' to list every answer so far");
    println!();
    println!("{}", "Options:".cyan());
    println!("  --base-url <URL>         Answer Service base URL");
    println!("  --answer-kind <KIND>     generic or reservation");
    println!("  --timeout-secs <SECS>    Per-request timeout");
    println!("  --config <PATH>          Configuration file");
    println!("  --json                   Print answers as JSON");
    println!("  --help                   Show this help message");
    println!();
}
