//! Yes/no, choice, and free-text prompts used when configuration is incomplete.

use std::io::{BufRead, Write};

use thiserror::Error;

/// Errors returned by an interaction oracle.
#[derive(Debug, Error)]
pub enum InteractionError {
    /// The oracle cannot ask questions (batch mode).
    #[error("input required but prompting is disabled: {message}")]
    Unavailable { message: String },
    /// No options were available to choose from.
    #[error("nothing to choose from: {message}")]
    NoOptions { message: String },
    /// The answer could not be understood.
    #[error("invalid answer {answer:?} to {message:?}")]
    InvalidAnswer { message: String, answer: String },
    #[error("failed to read answer: {0}")]
    Io(#[from] std::io::Error),
}

/// Source of answers for questions the configuration left open.
pub trait Interaction {
    fn confirm(&mut self, message: &str, default: bool) -> Result<bool, InteractionError>;

    /// Pick exactly one of `options`.
    fn choose(&mut self, message: &str, options: &[String]) -> Result<String, InteractionError>;

    /// Pick any subset of `options`, returned in option order.
    fn choose_many(
        &mut self,
        message: &str,
        options: &[String],
    ) -> Result<Vec<String>, InteractionError>;

    fn text(&mut self, message: &str, default: Option<&str>) -> Result<String, InteractionError>;
}

/// Oracle that refuses every question.
///
/// Fully specified configurations never reach it; anything else fails with
/// [`InteractionError::Unavailable`] naming the missing answer.
#[derive(Debug, Default, Clone, Copy)]
pub struct BatchInteraction;

impl Interaction for BatchInteraction {
    fn confirm(&mut self, message: &str, _default: bool) -> Result<bool, InteractionError> {
        Err(unavailable(message))
    }

    fn choose(&mut self, message: &str, _options: &[String]) -> Result<String, InteractionError> {
        Err(unavailable(message))
    }

    fn choose_many(
        &mut self,
        message: &str,
        _options: &[String],
    ) -> Result<Vec<String>, InteractionError> {
        Err(unavailable(message))
    }

    fn text(&mut self, message: &str, _default: Option<&str>) -> Result<String, InteractionError> {
        Err(unavailable(message))
    }
}

fn unavailable(message: &str) -> InteractionError {
    InteractionError::Unavailable {
        message: message.to_string(),
    }
}

/// Line-oriented prompts over any reader/writer pair (stdin/stdout for the CLI).
pub struct TerminalInteraction<R, W> {
    input: R,
    output: W,
}

impl TerminalInteraction<std::io::StdinLock<'static>, std::io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(std::io::stdin().lock(), std::io::stdout())
    }
}

impl<R: BufRead, W: Write> TerminalInteraction<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn ask(&mut self, prompt: &str) -> Result<String, InteractionError> {
        write!(self.output, "{prompt} ")?;
        self.output.flush()?;
        let mut line = String::new();
        self.input.read_line(&mut line)?;
        Ok(line.trim().to_string())
    }

    fn list_options(&mut self, options: &[String]) -> Result<(), InteractionError> {
        for (idx, option) in options.iter().enumerate() {
            writeln!(self.output, "  {}) {option}", idx + 1)?;
        }
        Ok(())
    }
}

impl<R: BufRead, W: Write> Interaction for TerminalInteraction<R, W> {
    fn confirm(&mut self, message: &str, default: bool) -> Result<bool, InteractionError> {
        let hint = if default { "[Y/n]" } else { "[y/N]" };
        let answer = self.ask(&format!("{message} {hint}"))?;
        match answer.to_ascii_lowercase().as_str() {
            "" => Ok(default),
            "y" | "yes" => Ok(true),
            "n" | "no" => Ok(false),
            _ => Err(InteractionError::InvalidAnswer {
                message: message.to_string(),
                answer,
            }),
        }
    }

    fn choose(&mut self, message: &str, options: &[String]) -> Result<String, InteractionError> {
        if options.is_empty() {
            return Err(InteractionError::NoOptions {
                message: message.to_string(),
            });
        }
        self.list_options(options)?;
        let answer = self.ask(message)?;
        pick_option(message, options, &answer)
    }

    fn choose_many(
        &mut self,
        message: &str,
        options: &[String],
    ) -> Result<Vec<String>, InteractionError> {
        if options.is_empty() {
            return Err(InteractionError::NoOptions {
                message: message.to_string(),
            });
        }
        self.list_options(options)?;
        let answer = self.ask(&format!("{message} (comma separated)"))?;
        let mut picked = Vec::new();
        for part in answer.split(',').map(str::trim).filter(|part| !part.is_empty()) {
            let option = pick_option(message, options, part)?;
            if !picked.contains(&option) {
                picked.push(option);
            }
        }
        picked.sort_by_key(|name| options.iter().position(|option| option == name));
        Ok(picked)
    }

    fn text(&mut self, message: &str, default: Option<&str>) -> Result<String, InteractionError> {
        let prompt = match default {
            Some(default) => format!("{message} [{default}]"),
            None => message.to_string(),
        };
        let answer = self.ask(&prompt)?;
        if answer.is_empty() {
            if let Some(default) = default {
                return Ok(default.to_string());
            }
        }
        Ok(answer)
    }
}

/// Pre-recorded answer for [`ScriptedInteraction`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedAnswer {
    Confirm(bool),
    Choose(String),
    ChooseMany(Vec<String>),
    Text(String),
}

/// Oracle that replays answers in order, for tests and unattended replays.
///
/// Asking a question of a different kind than the next queued answer, or
/// running out of answers, is an error.
#[derive(Debug, Default, Clone)]
pub struct ScriptedInteraction {
    answers: std::collections::VecDeque<ScriptedAnswer>,
    asked: Vec<String>,
}

impl ScriptedInteraction {
    pub fn new(answers: impl IntoIterator<Item = ScriptedAnswer>) -> Self {
        Self {
            answers: answers.into_iter().collect(),
            asked: Vec::new(),
        }
    }

    /// Every prompt received so far.
    pub fn asked(&self) -> &[String] {
        &self.asked
    }

    pub fn remaining(&self) -> usize {
        self.answers.len()
    }

    fn next(&mut self, message: &str) -> Result<ScriptedAnswer, InteractionError> {
        self.asked.push(message.to_string());
        self.answers.pop_front().ok_or_else(|| unavailable(message))
    }
}

fn mismatch(message: &str, got: ScriptedAnswer) -> InteractionError {
    InteractionError::InvalidAnswer {
        message: message.to_string(),
        answer: format!("{got:?}"),
    }
}

impl Interaction for ScriptedInteraction {
    fn confirm(&mut self, message: &str, _default: bool) -> Result<bool, InteractionError> {
        match self.next(message)? {
            ScriptedAnswer::Confirm(value) => Ok(value),
            other => Err(mismatch(message, other)),
        }
    }

    fn choose(&mut self, message: &str, options: &[String]) -> Result<String, InteractionError> {
        match self.next(message)? {
            ScriptedAnswer::Choose(value) => pick_option(message, options, &value),
            other => Err(mismatch(message, other)),
        }
    }

    fn choose_many(
        &mut self,
        message: &str,
        options: &[String],
    ) -> Result<Vec<String>, InteractionError> {
        match self.next(message)? {
            ScriptedAnswer::ChooseMany(values) => values
                .iter()
                .map(|value| pick_option(message, options, value))
                .collect(),
            other => Err(mismatch(message, other)),
        }
    }

    fn text(&mut self, message: &str, default: Option<&str>) -> Result<String, InteractionError> {
        match self.next(message)? {
            ScriptedAnswer::Text(value) if value.is_empty() => {
                Ok(default.unwrap_or_default().to_string())
            }
            ScriptedAnswer::Text(value) => Ok(value),
            other => Err(mismatch(message, other)),
        }
    }
}

/// Accept either a 1-based index or the option text itself.
fn pick_option(
    message: &str,
    options: &[String],
    answer: &str,
) -> Result<String, InteractionError> {
    if let Ok(index) = answer.parse::<usize>()
        && let Some(option) = index.checked_sub(1).and_then(|idx| options.get(idx))
    {
        return Ok(option.clone());
    }
    options
        .iter()
        .find(|option| option.as_str() == answer)
        .cloned()
        .ok_or_else(|| InteractionError::InvalidAnswer {
            message: message.to_string(),
            answer: answer.to_string(),
        })
}
