use crate::{
    observers::{Observers, Subscription},
    session::Transition,
};

use tracing::{debug, info};
use uuid::Uuid;

/// Snapshot of the single-select choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SelectionState {
    /// Select mode is active.
    pub is_selecting: bool,
    /// Chosen recording. Only meaningful while selecting.
    pub selected_id: Option<Uuid>,
}

/// Tracks which recording the user picked in select mode.
///
/// Independent of playback: selecting never plays and playing never
/// selects.
#[derive(Default)]
pub struct SelectionCoordinator {
    state: SelectionState,
    observers: Observers<SelectionState>,
}

impl SelectionCoordinator {
    /// Creates a coordinator outside select mode with nothing selected.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state snapshot.
    pub fn state(&self) -> SelectionState {
        self.state
    }

    /// Registers a listener called after every state change.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&SelectionState) + Send + Sync + 'static,
    {
        self.observers.subscribe(listener)
    }

    /// Enters select mode, keeping any earlier selection.
    pub fn enter_select_mode(&mut self) -> Transition {
        if self.state.is_selecting {
            debug!("Already in select mode");
            return Transition::Ignored;
        }

        self.state.is_selecting = true;
        info!(selected_id = ?self.state.selected_id, "Select mode entered");
        self.notify();

        Transition::Applied
    }

    /// Selects `id`, or deselects it if it is already selected.
    ///
    /// Selecting a different id replaces the previous choice. Returns the
    /// selection after the toggle.
    pub fn toggle_select(&mut self, id: Uuid) -> Option<Uuid> {
        self.state.selected_id = if self.state.selected_id == Some(id) {
            None
        } else {
            Some(id)
        };
        debug!(selected_id = ?self.state.selected_id, "Selection toggled");
        self.notify();

        self.state.selected_id
    }

    /// Leaves select mode and hands back the chosen id.
    ///
    /// Returns `None` without changing anything outside select mode. Inside
    /// select mode, always leaves it and clears the selection.
    pub fn confirm_selection(&mut self) -> Option<Uuid> {
        if !self.state.is_selecting {
            debug!("Confirm ignored: not in select mode");
            return None;
        }

        let selected = self.state.selected_id.take();
        self.state.is_selecting = false;
        info!(selected_id = ?selected, "Selection confirmed");
        self.notify();

        selected
    }

    /// Leaves select mode without handing anything back.
    ///
    /// The selection is kept and comes back on the next
    /// [`Self::enter_select_mode`].
    pub fn cancel_select_mode(&mut self) -> Transition {
        if !self.state.is_selecting {
            return Transition::Ignored;
        }

        self.state.is_selecting = false;
        info!("Select mode cancelled");
        self.notify();

        Transition::Applied
    }

    /// Drops `id` from the selection, e.g. after it was deleted.
    pub fn forget(&mut self, id: Uuid) -> Transition {
        if self.state.selected_id != Some(id) {
            return Transition::Ignored;
        }

        self.state.selected_id = None;
        debug!(recording_id = %id, "Deleted recording removed from selection");
        self.notify();

        Transition::Applied
    }

    fn notify(&self) {
        self.observers.notify(&self.state);
    }
}
