use crate::{
    AppCommand, AppError, AppResult,
    app_command::{HELP, RecordingRef},
    status_line,
};

use std::{panic::Location, sync::Arc};

use error_location::ErrorLocation;
use tokio::sync::{mpsc, watch};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use voice_memo_core::{
    PlaybackSessionManager, Recording, RecordingRepository, RecordingSessionManager,
    SelectionCoordinator, SortOrder, Subscription, Transition,
};

/// Main application state.
///
/// Owns the repository and the three managers, and applies commands from
/// the command reader one at a time. Every manager is subscribed so state
/// changes are echoed as status lines, including playback finishing on its
/// own.
pub struct App {
    repository: Arc<dyn RecordingRepository>,
    recorder: Option<RecordingSessionManager>,
    player: Option<PlaybackSessionManager>,
    selection: SelectionCoordinator,
    /// Ids of the last `list` output by position. Deleted entries are `None`
    /// so positions the user already saw keep their meaning.
    listing: Vec<Option<Uuid>>,
    command_rx: mpsc::Receiver<AppCommand>,
    shutdown_tx: watch::Sender<bool>,
    _subscriptions: Vec<Subscription>,
}

impl App {
    /// Wire up the managers. `recorder` and `player` are `None` when no
    /// audio hardware is available.
    pub(crate) fn new(
        repository: Arc<dyn RecordingRepository>,
        recorder: Option<RecordingSessionManager>,
        player: Option<PlaybackSessionManager>,
        command_rx: mpsc::Receiver<AppCommand>,
        shutdown_tx: watch::Sender<bool>,
    ) -> Self {
        let selection = SelectionCoordinator::new();

        let mut subscriptions =
            vec![selection.subscribe(|state| println!("{}", status_line::selection(state)))];
        if let Some(recorder) = &recorder {
            subscriptions
                .push(recorder.subscribe(|state| println!("{}", status_line::recording(state))));
        }
        if let Some(player) = &player {
            subscriptions
                .push(player.subscribe(|state| println!("{}", status_line::playback(state))));
        }

        Self {
            repository,
            recorder,
            player,
            selection,
            listing: Vec::new(),
            command_rx,
            shutdown_tx,
            _subscriptions: subscriptions,
        }
    }

    #[cfg(test)]
    pub(crate) fn playback_state(&self) -> Option<voice_memo_core::PlaybackState> {
        self.player.as_ref().map(PlaybackSessionManager::state)
    }

    #[cfg(test)]
    pub(crate) fn selection_state(&self) -> voice_memo_core::SelectionState {
        self.selection.state()
    }

    /// Run the main application event loop.
    #[instrument(skip(self))]
    pub(crate) async fn run(mut self) -> AppResult<()> {
        info!("Voice Memo starting");
        println!("Type 'help' for commands.");

        loop {
            tokio::select! {
                Some(command) = self.command_rx.recv() => {
                    if command == AppCommand::Shutdown {
                        info!("Shutdown requested");
                        break;
                    }
                    // Stopping a capture encodes and resamples the whole take.
                    match tokio::task::block_in_place(|| self.execute(command)) {
                        Ok(output) if output.is_empty() => {}
                        Ok(output) => println!("{}", output),
                        Err(e) => {
                            warn!(error = %e, "Command failed");
                            println!("! {}", e);
                        }
                    }
                }

                else => {
                    info!("Command channel closed, shutting down");
                    break;
                }
            }
        }

        self.shutdown();
        let _ = self.shutdown_tx.send(true);
        info!("Voice Memo shut down successfully");

        Ok(())
    }

    /// Apply one command and return the text to show for it.
    ///
    /// State changes are also reported through the subscriptions, so
    /// applied transitions return an empty string.
    #[instrument(skip(self))]
    pub(crate) fn execute(&mut self, command: AppCommand) -> AppResult<String> {
        match command {
            AppCommand::StartRecording => {
                self.recorder()?.start_recording()?;
                Ok(String::new())
            }
            AppCommand::PauseRecording => {
                let outcome = self.recorder()?.pause_recording()?;
                Ok(ignored_or_empty(outcome, "Not recording"))
            }
            AppCommand::ResumeRecording => {
                let outcome = self.recorder()?.resume_recording()?;
                Ok(ignored_or_empty(outcome, "Recording is not paused"))
            }
            AppCommand::StopRecording { name } => {
                let saved = self.recorder()?.stop_recording(name.as_deref())?;
                Ok(saved_message(&saved))
            }
            AppCommand::RetryPersist => {
                let saved = self.recorder()?.retry_persist()?;
                Ok(saved_message(&saved))
            }
            AppCommand::DiscardPending => Ok(match self.recorder()?.discard_pending() {
                Some(recording) => format!("Discarded '{}'", recording.display_name()),
                None => "Nothing to discard".to_string(),
            }),
            AppCommand::List => self.list(),
            AppCommand::Play(target) => {
                let recording = self.fetch(target)?;
                self.player()?.play(&recording)?;
                Ok(String::new())
            }
            AppCommand::PausePlayback => {
                let outcome = self.player()?.pause()?;
                Ok(ignored_or_empty(outcome, "Nothing is playing"))
            }
            AppCommand::ResumePlayback => {
                let outcome = self.player()?.resume()?;
                Ok(ignored_or_empty(outcome, "Nothing to resume"))
            }
            AppCommand::StopPlayback => {
                let outcome = self.player()?.stop();
                Ok(ignored_or_empty(outcome, "Nothing is playing"))
            }
            AppCommand::Delete(target) => self.delete(target),
            AppCommand::EnterSelectMode => {
                let outcome = self.selection.enter_select_mode();
                Ok(ignored_or_empty(outcome, "Already in select mode"))
            }
            AppCommand::ToggleSelect(target) => {
                let id = self.resolve(target)?;
                self.selection.toggle_select(id);
                Ok(String::new())
            }
            AppCommand::ConfirmSelection => self.confirm(),
            AppCommand::CancelSelectMode => {
                let outcome = self.selection.cancel_select_mode();
                Ok(ignored_or_empty(outcome, "Not in select mode"))
            }
            AppCommand::Help => Ok(HELP.to_string()),
            AppCommand::Shutdown => Ok(String::new()),
        }
    }

    fn list(&mut self) -> AppResult<String> {
        let recordings = self.repository.list(SortOrder::NewestFirst)?;
        self.listing = recordings.iter().map(|r| Some(r.id)).collect();

        let mut lines: Vec<String> = if recordings.is_empty() {
            vec!["No recordings".to_string()]
        } else {
            let playback = self.player.as_ref().map(|p| p.state()).unwrap_or_default();
            let selection = self.selection.state();
            recordings
                .iter()
                .enumerate()
                .map(|(i, r)| status_line::row(i + 1, r, &playback, &selection))
                .collect()
        };

        if let Some(pending) = self.recorder.as_ref().and_then(|r| r.pending_recording()) {
            lines.push(format!(
                "Unsaved: '{}' ({} bytes), type 'retry' or 'discard'",
                pending.display_name(),
                pending.payload_len
            ));
        }

        Ok(lines.join("\n"))
    }

    /// Stops its playback and drops it from the selection before removing
    /// it from the store.
    #[instrument(skip(self))]
    fn delete(&mut self, target: RecordingRef) -> AppResult<String> {
        let id = self.resolve(target)?;
        let recording = self.fetch_id(id)?;

        if let Some(player) = &self.player {
            if player.state().is_current(id) {
                let _ = player.stop();
            }
        }
        let _ = self.selection.forget(id);

        let deleted = self.repository.delete(id)?;
        self.repository.save()?;

        for entry in self.listing.iter_mut() {
            if *entry == Some(id) {
                *entry = None;
            }
        }

        if deleted {
            info!(recording_id = %id, "Recording deleted");
        }
        Ok(format!("Deleted '{}'", recording.display_name()))
    }

    fn confirm(&mut self) -> AppResult<String> {
        if !self.selection.state().is_selecting {
            return Ok("Not in select mode".to_string());
        }

        match self.selection.confirm_selection() {
            Some(id) => {
                let name = match self.repository.get(id)? {
                    Some(recording) => recording.display_name().to_string(),
                    None => id.to_string(),
                };
                info!(recording_id = %id, "Recording chosen");
                Ok(format!("Chose '{}'", name))
            }
            None => Ok("Nothing chosen".to_string()),
        }
    }

    #[track_caller]
    fn resolve(&self, target: RecordingRef) -> AppResult<Uuid> {
        match target {
            RecordingRef::Id(id) => Ok(id),
            RecordingRef::Index(position) => match position.checked_sub(1).and_then(|i| self.listing.get(i)) {
                Some(Some(id)) => Ok(*id),
                Some(None) => Err(AppError::InvalidCommand {
                    reason: format!("Recording {} was deleted", position),
                    location: ErrorLocation::from(Location::caller()),
                }),
                None => Err(AppError::InvalidCommand {
                    reason: format!("No recording at position {}, run 'list' first", position),
                    location: ErrorLocation::from(Location::caller()),
                }),
            },
        }
    }

    #[track_caller]
    fn fetch(&self, target: RecordingRef) -> AppResult<Recording> {
        let id = self.resolve(target)?;
        self.fetch_id(id)
    }

    #[track_caller]
    fn fetch_id(&self, id: Uuid) -> AppResult<Recording> {
        self.repository
            .get(id)?
            .ok_or_else(|| AppError::InvalidCommand {
                reason: format!("No recording with id {}", id),
                location: ErrorLocation::from(Location::caller()),
            })
    }

    #[track_caller]
    fn recorder(&mut self) -> AppResult<&mut RecordingSessionManager> {
        self.recorder
            .as_mut()
            .ok_or_else(|| AppError::HardwareUnavailable {
                reason: "no microphone support".to_string(),
                location: ErrorLocation::from(Location::caller()),
            })
    }

    #[track_caller]
    fn player(&self) -> AppResult<&PlaybackSessionManager> {
        self.player
            .as_ref()
            .ok_or_else(|| AppError::HardwareUnavailable {
                reason: "no speaker support".to_string(),
                location: ErrorLocation::from(Location::caller()),
            })
    }

    /// Release devices. A recording still in progress is kept if possible.
    fn shutdown(&mut self) {
        if let Some(player) = &self.player {
            let _ = player.stop();
        }

        let Some(recorder) = self.recorder.as_mut() else {
            return;
        };
        if recorder.state().is_recording() {
            match recorder.stop_recording(None) {
                Ok(saved) => info!(recording_id = %saved.id, "Recording in progress saved on exit"),
                Err(e) => error!(error = %e, "Recording in progress lost on exit"),
            }
        }
        if let Some(pending) = recorder.discard_pending() {
            warn!(recording_id = %pending.id, "Unsaved recording dropped on exit");
        }
    }
}

fn ignored_or_empty(outcome: Transition, message: &str) -> String {
    match outcome {
        Transition::Applied => String::new(),
        Transition::Ignored => message.to_string(),
    }
}

fn saved_message(recording: &Recording) -> String {
    let length = recording
        .duration()
        .map(status_line::clock)
        .unwrap_or_else(|| "--:--".to_string());
    format!("Saved '{}' ({})", recording.display_name(), length)
}
