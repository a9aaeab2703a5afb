use crate::{AppError, AppResult};

use std::{panic::Location, str::FromStr};

use error_location::ErrorLocation;
use uuid::Uuid;

/// A recording picked by its 1-based position in the last listing or by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingRef {
    /// Position in the most recent `list` output.
    Index(usize),
    /// Recording id.
    Id(Uuid),
}

impl FromStr for RecordingRef {
    type Err = AppError;

    #[track_caller]
    fn from_str(s: &str) -> AppResult<Self> {
        if let Ok(index) = s.parse::<usize>() {
            if index == 0 {
                return Err(AppError::InvalidCommand {
                    reason: "Listing positions start at 1".to_string(),
                    location: ErrorLocation::from(Location::caller()),
                });
            }
            return Ok(RecordingRef::Index(index));
        }

        Uuid::parse_str(s)
            .map(RecordingRef::Id)
            .map_err(|_| AppError::InvalidCommand {
                reason: format!("'{}' is neither a list position nor a recording id", s),
                location: ErrorLocation::from(Location::caller()),
            })
    }
}

/// Commands sent from the command reader to the main application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    /// Start a new recording.
    StartRecording,
    /// Pause the current recording.
    PauseRecording,
    /// Resume a paused recording.
    ResumeRecording,
    /// Stop and persist the current recording.
    StopRecording {
        /// Name to store it under. `None` uses the configured default.
        name: Option<String>,
    },
    /// Try again to persist a recording the store rejected.
    RetryPersist,
    /// Drop a recording the store rejected.
    DiscardPending,
    /// Print all stored recordings.
    List,
    /// Play a recording, replacing any current playback.
    Play(RecordingRef),
    /// Pause playback.
    PausePlayback,
    /// Resume paused playback.
    ResumePlayback,
    /// Stop playback.
    StopPlayback,
    /// Delete a recording.
    Delete(RecordingRef),
    /// Enter select mode.
    EnterSelectMode,
    /// Select or deselect a recording.
    ToggleSelect(RecordingRef),
    /// Confirm the selection and leave select mode.
    ConfirmSelection,
    /// Leave select mode without confirming.
    CancelSelectMode,
    /// Print the command summary.
    Help,
    /// Request application shutdown.
    Shutdown,
}

impl AppCommand {
    /// Parses one input line.
    ///
    /// Returns `Ok(None)` for blank lines.
    #[track_caller]
    pub fn parse(line: &str) -> AppResult<Option<Self>> {
        let line = line.trim();
        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };

        let command = match verb.to_ascii_lowercase().as_str() {
            "" => return Ok(None),
            "record" => AppCommand::StartRecording,
            "pause" => AppCommand::PauseRecording,
            "resume" => AppCommand::ResumeRecording,
            "stop" => AppCommand::StopRecording {
                name: (!rest.is_empty()).then(|| rest.to_string()),
            },
            "retry" => AppCommand::RetryPersist,
            "discard" => AppCommand::DiscardPending,
            "list" | "ls" => AppCommand::List,
            "play" => AppCommand::Play(Self::target(verb, rest)?),
            "pause-play" => AppCommand::PausePlayback,
            "resume-play" => AppCommand::ResumePlayback,
            "stop-play" => AppCommand::StopPlayback,
            "delete" | "rm" => AppCommand::Delete(Self::target(verb, rest)?),
            "select" => AppCommand::EnterSelectMode,
            "toggle" => AppCommand::ToggleSelect(Self::target(verb, rest)?),
            "done" => AppCommand::ConfirmSelection,
            "cancel" => AppCommand::CancelSelectMode,
            "help" | "?" => AppCommand::Help,
            "quit" | "exit" => AppCommand::Shutdown,
            other => {
                return Err(AppError::InvalidCommand {
                    reason: format!("Unknown command '{}', try 'help'", other),
                    location: ErrorLocation::from(Location::caller()),
                });
            }
        };

        Ok(Some(command))
    }

    #[track_caller]
    fn target(verb: &str, rest: &str) -> AppResult<RecordingRef> {
        if rest.is_empty() {
            return Err(AppError::InvalidCommand {
                reason: format!("'{}' needs a list position or recording id", verb),
                location: ErrorLocation::from(Location::caller()),
            });
        }
        RecordingRef::from_str(rest)
    }
}

/// One-line summary per command, printed by `help`.
pub(crate) const HELP: &str = "\
record | pause | resume | stop [name]   capture a memo
retry | discard                         handle a memo the store rejected
list                                    show stored memos
play <n|id> | pause-play | resume-play | stop-play
delete <n|id>
select | toggle <n|id> | done | cancel  pick a memo
quit";
