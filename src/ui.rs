// UI layer: the human checkpoints of a release. Answers come through the
// `Prompt` trait so the release flow can be driven without a terminal;
// `TerminalPrompt` is the `dialoguer` implementation used by the binary.

use crate::error::{ReleaseError, Result};
use dialoguer::theme::Theme;
use dialoguer::Input;
use indicatif::{ProgressBar, ProgressStyle};
use std::fmt;
use std::io;
use std::time::Duration;

/// The only answer that counts as approval. Matching is exact and case-sensitive.
pub const AFFIRMATIVE: &str = "Yes";

/// Something that can ask a question and hand back one line of answer.
pub trait Prompt {
    fn ask(&mut self, question: &str) -> io::Result<String>;
}

/// Theme that prints questions as written, without dialoguer's `: ` suffix,
/// so the terminal shows `Proceed (Yes/No)? `.
pub struct PlainTheme;

impl Theme for PlainTheme {
    fn format_input_prompt(
        &self,
        f: &mut dyn fmt::Write,
        prompt: &str,
        _default: Option<&str>,
    ) -> fmt::Result {
        write!(f, "{} ", prompt)
    }

    fn format_input_prompt_selection(
        &self,
        f: &mut dyn fmt::Write,
        prompt: &str,
        sel: &str,
    ) -> fmt::Result {
        write!(f, "{} {}", prompt, sel)
    }
}

/// Reads answers from the terminal with `dialoguer::Input`.
#[derive(Default)]
pub struct TerminalPrompt;

impl Prompt for TerminalPrompt {
    fn ask(&mut self, question: &str) -> io::Result<String> {
        // `allow_empty` so a bare Enter is a decline rather than a re-prompt.
        Input::<String>::with_theme(&PlainTheme)
            .with_prompt(question)
            .allow_empty(true)
            .interact_text()
    }
}

fn approved(prompt: &mut dyn Prompt, question: &str) -> Result<bool> {
    let answer = prompt.ask(question).map_err(ReleaseError::Prompt)?;
    Ok(answer == AFFIRMATIVE)
}

/// Manual test gate. Nothing is executed here: the person releasing runs
/// the mod's tests and says whether they passed.
pub fn confirm_tested(prompt: &mut dyn Prompt) -> Result<bool> {
    println!("Run tests.");
    if approved(prompt, "Proceed (Yes/No)?")? {
        Ok(true)
    } else {
        println!("Aborting. END.");
        Ok(false)
    }
}

/// Last check before the archive leaves the machine.
pub fn confirm_upload(prompt: &mut dyn Prompt, filename: &str) -> Result<bool> {
    if approved(prompt, &format!("Upload {} (Yes/No)?", filename))? {
        Ok(true)
    } else {
        println!("Upload canceled.");
        Ok(false)
    }
}

/// Spinner shown while a blocking request runs. Call `finish_and_clear` when done.
pub fn spinner(message: impl Into<String>) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("{spinner} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    spinner.set_style(style);
    spinner.set_message(message.into());
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Prompt that replays canned answers and remembers what it was asked.
#[cfg(test)]
pub(crate) struct ScriptedPrompt {
    answers: std::collections::VecDeque<String>,
    pub questions: Vec<String>,
}

#[cfg(test)]
impl ScriptedPrompt {
    pub fn new(answers: &[&str]) -> Self {
        ScriptedPrompt {
            answers: answers.iter().map(|a| a.to_string()).collect(),
            questions: Vec::new(),
        }
    }
}

#[cfg(test)]
impl Prompt for ScriptedPrompt {
    fn ask(&mut self, question: &str) -> io::Result<String> {
        self.questions.push(question.to_string());
        self.answers
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "no scripted answer left"))
    }
}
