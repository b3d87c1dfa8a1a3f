use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use console::Term;
use std::io::{self, BufRead, IsTerminal, Write};

/// A source of answers to interactive questions.
#[async_trait]
pub trait Prompt: Send + Sync {
    /// Shows `question` and returns the line typed in reply, without the newline.
    async fn ask(&self, question: &str) -> Result<String>;
}

/// Reads answers from the terminal, or from piped stdin when there is none.
///
/// Reads happen on a blocking thread so an interrupt can still be observed
/// while waiting for input.
pub struct TermPrompt;

#[async_trait]
impl Prompt for TermPrompt {
    async fn ask(&self, question: &str) -> Result<String> {
        let question = question.to_string();
        tokio::task::spawn_blocking(move || {
            let term = Term::stdout();
            if term.is_term() && io::stdin().is_terminal() {
                term.write_str(&question)?;
                term.flush()?;
                return term.read_line().context("Failed to read input");
            }

            let mut stdout = io::stdout().lock();
            stdout.write_all(question.as_bytes())?;
            stdout.flush()?;
            read_answer(&mut io::stdin().lock())
        })
        .await
        .context("Prompt task failed")?
    }
}

/// Reads one line from `reader` with the line ending stripped.
///
/// Running out of input is an error rather than an empty answer.
pub fn read_answer<R: BufRead>(reader: &mut R) -> Result<String> {
    let mut line = String::new();
    if reader
        .read_line(&mut line)
        .context("Failed to read input")?
        == 0
    {
        bail!("No more input");
    }
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
