//! Voice Memo: record, list and play back voice memos from the terminal.

mod app;
mod app_command;
mod command_reader;
mod config;
mod devices;
mod error;
mod status_line;

pub(crate) use {
    app::App,
    app_command::AppCommand,
    command_reader::CommandReader,
    error::{AppError, Result as AppResult},
};

use crate::config::Config;

use std::{io, sync::Arc, time::Duration};

use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use voice_memo_core::{
    FileRecordingRepository, PlaybackSessionManager, RecordingRepository,
    RecordingSessionManager,
};

const DEFAULT_LOG_FILTER: &str = "voice_memo=info,voice_memo_core=info";

/// Application entry point.
fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(io::stderr)
        .init();

    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to load config: {:?}", e);
            std::process::exit(1);
        }
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!("Failed to create tokio runtime: {:?}", e);
            std::process::exit(1);
        }
    };

    let result = runtime.block_on(run(config));

    // The input forwarder may still be blocked reading stdin.
    runtime.shutdown_timeout(Duration::from_millis(100));

    if let Err(e) = result {
        error!(error = ?e, "App error");
        std::process::exit(1);
    }
}

async fn run(config: Config) -> AppResult<()> {
    let directory = config.storage_directory()?;
    let repository: Arc<dyn RecordingRepository> =
        Arc::new(FileRecordingRepository::open(&directory)?);

    let recorder = match devices::capture_device() {
        Ok(device) => Some(
            RecordingSessionManager::new(device, Arc::clone(&repository))
                .with_default_name(config.recording.default_name.clone()),
        ),
        Err(e) => {
            warn!(error = %e, "Recording disabled");
            None
        }
    };

    let player = match devices::playback_device() {
        Ok(device) => Some(PlaybackSessionManager::new(
            device,
            config.playback.grace_delay(),
        )?),
        Err(e) => {
            warn!(error = %e, "Playback disabled");
            None
        }
    };

    info!(
        directory = ?directory,
        recording = recorder.is_some(),
        playback = player.is_some(),
        "Recording store ready"
    );

    let (command_tx, command_rx) = mpsc::channel(32);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let reader = CommandReader::new(command_tx);
    let app = App::new(repository, recorder, player, command_rx, shutdown_tx);

    let (reader_result, app_result) = tokio::join!(
        reader.run(io::BufReader::new(io::stdin()), shutdown_rx),
        app.run()
    );

    if let Err(e) = reader_result {
        error!(error = ?e, "Command reader error");
    }
    app_result
}
