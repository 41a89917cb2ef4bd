//! Interactive session loop
//!
//! `WaitingForInput → Processing → WaitingForInput`, until the exit keyword,
//! end of input, or an input failure moves it to `Stopped`.

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::io::Write;
use tracing::Instrument;

use crate::error::{Error, Result};

use super::chat::{ChatSession, TurnOutcome};

const RESPONSE_HEADER: &str = "=== AI Response ===";
const RESPONSE_FOOTER: &str = "===================";

/// Line-oriented source of user input
pub trait LineSource {
    /// Read one line after showing `prompt`.
    ///
    /// `Ok(None)` means the input has ended.
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>>;
}

/// Terminal input backed by rustyline
pub struct RustylineSource {
    editor: DefaultEditor,
}

impl RustylineSource {
    pub fn new() -> Result<Self> {
        let editor = DefaultEditor::new()
            .map_err(|e| Error::Input(format!("Failed to open terminal: {}", e)))?;
        Ok(Self { editor })
    }
}

impl LineSource for RustylineSource {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        match self.editor.readline(prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    let _ = self.editor.add_history_entry(line.as_str());
                }
                Ok(Some(line))
            }
            // Ctrl-D and Ctrl-C end the session like the exit keyword
            Err(ReadlineError::Eof) | Err(ReadlineError::Interrupted) => Ok(None),
            Err(e) => Err(Error::Input(e.to_string())),
        }
    }
}

/// Where the loop currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    WaitingForInput,
    Processing,
    Stopped,
}

/// How the session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// Exit keyword or end of input
    Normal,
    /// Reading input failed
    InputFailure,
}

impl ExitStatus {
    /// Process exit code for this status
    pub fn code(&self) -> i32 {
        match self {
            ExitStatus::Normal => 0,
            ExitStatus::InputFailure => 1,
        }
    }
}

/// Summary returned when the loop stops
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOutcome {
    pub status: ExitStatus,
    /// Questions answered successfully
    pub turns_completed: usize,
}

/// Drives a `ChatSession` from a `LineSource`, writing to `W`
pub struct SessionLoop<S, W> {
    session: ChatSession,
    input: S,
    output: W,
    prompt: String,
    exit_keyword: String,
    state: SessionState,
}

impl<S: LineSource, W: Write> SessionLoop<S, W> {
    pub fn new(session: ChatSession, input: S, output: W) -> Self {
        Self {
            session,
            input,
            output,
            prompt: "Ask me anything --> ".to_string(),
            exit_keyword: "exit".to_string(),
            state: SessionState::WaitingForInput,
        }
    }

    /// Set the input prompt
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    /// Set the keyword that ends the session (matched case-insensitively)
    pub fn with_exit_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.exit_keyword = keyword.into();
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn session(&self) -> &ChatSession {
        &self.session
    }

    pub fn output(&self) -> &W {
        &self.output
    }

    /// Run until the session stops.
    ///
    /// Only failures to write output are returned as errors; turn failures
    /// are logged and reported to the user, and the loop keeps going.
    pub async fn run(&mut self) -> Result<SessionOutcome> {
        let span = tracing::info_span!("session", id = %self.session.id());
        self.run_loop().instrument(span).await
    }

    async fn run_loop(&mut self) -> Result<SessionOutcome> {
        tracing::info!("Session started");
        writeln!(
            self.output,
            "RAG Chatbot initialized. Type '{}' to quit.\n",
            self.exit_keyword
        )?;

        let mut turns_completed = 0;
        let status = loop {
            self.state = SessionState::WaitingForInput;
            self.output.flush()?;

            let line = match self.input.read_line(&self.prompt) {
                Ok(Some(line)) => line,
                Ok(None) => {
                    writeln!(self.output, "Goodbye!")?;
                    break ExitStatus::Normal;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Reading input failed");
                    writeln!(self.output, "Could not read input: {}", e)?;
                    break ExitStatus::InputFailure;
                }
            };

            if self.is_exit(&line) {
                writeln!(self.output, "Goodbye!")?;
                break ExitStatus::Normal;
            }
            if line.trim().is_empty() {
                continue;
            }

            self.state = SessionState::Processing;
            match self.session.ask(&line).await {
                Ok(outcome) => {
                    self.print_answer(&outcome)?;
                    turns_completed += 1;
                }
                Err(e) => {
                    log_turn_failure(&e);
                    writeln!(
                        self.output,
                        "Sorry, something went wrong while answering: {}\n",
                        e
                    )?;
                }
            }
        };

        self.state = SessionState::Stopped;
        self.output.flush()?;
        tracing::info!(turns_completed, ?status, "Session stopped");

        Ok(SessionOutcome {
            status,
            turns_completed,
        })
    }

    fn is_exit(&self, line: &str) -> bool {
        line.trim().to_lowercase() == self.exit_keyword.to_lowercase()
    }

    fn print_answer(&mut self, outcome: &TurnOutcome) -> Result<()> {
        if !outcome.found_context() {
            writeln!(
                self.output,
                "No relevant context was found in the documents."
            )?;
        }
        writeln!(self.output, "\n{}", RESPONSE_HEADER)?;
        writeln!(self.output, "{}", outcome.answer)?;
        writeln!(self.output, "{}\n", RESPONSE_FOOTER)?;
        Ok(())
    }
}

/// Log a failed turn with the service status and payload when available
fn log_turn_failure(error: &Error) {
    match error.service_failure() {
        Some(failure) => tracing::error!(
            error = %error,
            status = ?failure.status,
            payload = failure.payload.as_deref().unwrap_or(""),
            "Turn failed"
        ),
        None => tracing::error!(error = %error, "Turn failed"),
    }
}
