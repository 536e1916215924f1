//! Stand-ins for the terminal and the `claude` executable.

use crate::command::CommandVector;
use crate::core::QuickstartError;
use crate::process::{CommandRunner, ProcessOutput};
use crate::prompt::{Prompter, parse_confirmation};
use anyhow::{Result, anyhow};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Answers questions from a queue, in order.
///
/// An empty answer to `ask` yields the default, like pressing Enter. Running
/// out of answers is an error, so a test fails on any unexpected question.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: VecDeque<String>,
    assume_yes: bool,
    questions: Vec<String>,
}

impl ScriptedPrompter {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            assume_yes: false,
            questions: Vec::new(),
        }
    }

    /// Confirms everything; free-text questions take their defaults.
    #[must_use]
    pub fn yes() -> Self {
        Self {
            assume_yes: true,
            ..Self::default()
        }
    }

    /// Every question asked so far.
    #[must_use]
    pub fn questions(&self) -> &[String] {
        &self.questions
    }

    fn next(&mut self, question: &str) -> Result<Option<String>> {
        self.questions.push(question.to_string());
        if self.assume_yes && self.answers.is_empty() {
            return Ok(None);
        }
        self.answers
            .pop_front()
            .map(Some)
            .ok_or_else(|| anyhow!("unexpected question: {question}"))
    }
}

impl Prompter for ScriptedPrompter {
    async fn ask(&mut self, question: &str, default: Option<&str>) -> Result<String> {
        let answer = self.next(question)?.unwrap_or_default();
        if answer.is_empty() {
            Ok(default.unwrap_or_default().to_string())
        } else {
            Ok(answer)
        }
    }

    async fn ask_secret(&mut self, question: &str, default: Option<&str>) -> Result<String> {
        self.ask(question, default).await
    }

    async fn confirm(&mut self, question: &str, default: bool) -> Result<bool> {
        match self.next(question)? {
            None => Ok(true),
            Some(answer) => parse_confirmation(&answer, default)
                .ok_or_else(|| anyhow!("scripted answer '{answer}' is not yes/no")),
        }
    }
}

/// Records every command vector it is asked to run.
#[derive(Debug, Default)]
pub struct RecordingRunner {
    calls: Mutex<Vec<Vec<String>>>,
    fail: bool,
}

impl RecordingRunner {
    /// A runner whose every invocation exits with status 1.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    /// Token lists of all recorded invocations, oldest first.
    #[must_use]
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

impl CommandRunner for RecordingRunner {
    async fn run(&self, command: &CommandVector) -> Result<ProcessOutput> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(command.tokens().to_vec());
        }
        if self.fail {
            return Err(QuickstartError::ProcessFailed {
                command: command.redacted(),
                code: Some(1),
                stderr: "simulated failure".to_string(),
            }
            .into());
        }
        Ok(ProcessOutput::default())
    }
}
