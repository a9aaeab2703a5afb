//! Line-oriented command input.
//!
//! Reads commands from a blocking line source (stdin in the binary) on a
//! blocking task and forwards parsed [`AppCommand`]s to the main application
//! over an async channel.

use crate::{AppCommand, AppError, AppResult};

use std::{io::BufRead, panic::Location, time::Duration};

use error_location::ErrorLocation;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, instrument, warn};

/// Forwards typed commands to the application.
pub struct CommandReader {
    command_tx: mpsc::Sender<AppCommand>,
}

impl CommandReader {
    /// Create a reader that sends commands on `command_tx`.
    pub fn new(command_tx: mpsc::Sender<AppCommand>) -> Self {
        Self { command_tx }
    }

    /// Run the reader until `input` ends or shutdown is signalled.
    ///
    /// End of input is treated as a `quit`.
    #[instrument(skip(self, input, shutdown_rx))]
    pub async fn run<R>(&self, input: R, mut shutdown_rx: watch::Receiver<bool>) -> AppResult<()>
    where
        R: BufRead + Send + 'static,
    {
        let (line_tx, mut line_rx) = mpsc::channel::<String>(32);

        // Shutdown: when line_rx is dropped (loop breaks), the next
        // line_tx.blocking_send() fails, breaking the blocking loop.
        let handle = tokio::task::spawn_blocking(move || {
            for line in input.lines() {
                match line {
                    Ok(line) => {
                        if line_tx.blocking_send(line).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "Failed to read input line");
                        break;
                    }
                }
            }
        });

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    info!("Command reader shutting down");
                    break;
                }
                line = line_rx.recv() => match line {
                    Some(line) => self.handle_line(&line).await?,
                    None => {
                        info!("Input closed");
                        self.send(AppCommand::Shutdown).await?;
                        break;
                    }
                }
            }
        }

        drop(line_rx);

        // The blocking task may be stuck reading a line that never comes.
        // It is cleaned up by the runtime on exit regardless.
        match tokio::time::timeout(Duration::from_millis(200), handle).await {
            Ok(Ok(())) => debug!("Input forwarder stopped cleanly"),
            Ok(Err(e)) => warn!(error = ?e, "Input forwarder task panicked"),
            Err(_) => debug!("Input forwarder still blocked on read, leaving it to exit"),
        }

        Ok(())
    }

    async fn handle_line(&self, line: &str) -> AppResult<()> {
        match AppCommand::parse(line) {
            Ok(Some(command)) => self.send(command).await,
            Ok(None) => Ok(()),
            Err(e) => {
                debug!(error = %e, "Rejected input line");
                if let AppError::InvalidCommand { reason, .. } = &e {
                    println!("! {}", reason);
                }
                Ok(())
            }
        }
    }

    async fn send(&self, command: AppCommand) -> AppResult<()> {
        self.command_tx
            .send(command)
            .await
            .map_err(|e| AppError::ChannelSendFailed {
                message: format!("Failed to send command: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })
    }
}
