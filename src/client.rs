use std::fmt;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::context::ReportContext;
use crate::dialog::{DialogDecision, FlagEditDialog};
use crate::model::{Flag, FlagEdit, FlagSet};
use crate::page::{FlagPanel, Panel, ReportPage, TriggerControl};
use crate::store::{FlagStore, LuiError};

#[cfg(test)]
mod tests;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientState {
    Idle,
    Loading,
    Loaded,
    LoadError,
    Saving,
    SaveError,
}

impl ClientState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Loaded => "loaded",
            Self::LoadError => "load_error",
            Self::Saving => "saving",
            Self::SaveError => "save_error",
        }
    }

    pub fn in_flight(self) -> bool {
        matches!(self, Self::Loading | Self::Saving)
    }
}

impl fmt::Display for ClientState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClientError {
    #[error("lane flag client is busy ({0})")]
    Busy(ClientState),
    #[error("lane flags cannot be edited while the client is {0}")]
    NotEditable(ClientState),
    #[error("no flag panel is shown for lane {0}")]
    NoFlagPanel(String),
}

/// Work the client wants done against the flag store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlagRequest {
    FetchFlags { run_id: String },
    PutFlag { run_id: String, edit: FlagEdit },
}

/// Completion of a [`FlagRequest`]. A successful save carries the written
/// lane back so the page can be redrawn without another fetch.
#[derive(Debug)]
pub enum FlagEvent {
    LoadSucceeded(FlagSet),
    LoadFailed(LuiError),
    SaveSucceeded(FlagSet),
    SaveFailed(LuiError),
}

/// Executes one request against the store and reports how it ended.
pub fn drive<S: FlagStore + ?Sized>(store: &S, request: &FlagRequest) -> FlagEvent {
    match request {
        FlagRequest::FetchFlags { run_id } => match store.fetch_flags(run_id) {
            Ok(flags) => FlagEvent::LoadSucceeded(flags),
            Err(err) => FlagEvent::LoadFailed(err),
        },
        FlagRequest::PutFlag { run_id, edit } => match store.put_flag(run_id, edit) {
            Ok(()) => FlagEvent::SaveSucceeded(edit.to_flag_set()),
            Err(err) => FlagEvent::SaveFailed(err),
        },
    }
}

pub fn failure_message(action: &str, run_id: &str) -> String {
    format!("Failed to {action} usable/unusable flags for run {run_id}")
}

/// Keeps one report page in step with the LIMS flags of its run.
#[derive(Debug)]
pub struct LaneFlagClient {
    context: ReportContext,
    page: ReportPage,
    state: ClientState,
    flags: FlagSet,
    dialog: FlagEditDialog,
    last_error: Option<LuiError>,
}

impl LaneFlagClient {
    pub fn new(context: ReportContext, page: ReportPage) -> Self {
        Self {
            context,
            page,
            state: ClientState::Idle,
            flags: FlagSet::new(),
            dialog: FlagEditDialog::new(),
            last_error: None,
        }
    }

    pub fn context(&self) -> &ReportContext {
        &self.context
    }

    pub fn state(&self) -> ClientState {
        self.state
    }

    pub fn page(&self) -> &ReportPage {
        &self.page
    }

    pub fn flags(&self) -> &FlagSet {
        &self.flags
    }

    pub fn dialog(&self) -> &FlagEditDialog {
        &self.dialog
    }

    pub fn take_error(&mut self) -> Option<LuiError> {
        self.last_error.take()
    }

    pub fn active_flag(&self) -> Flag {
        self.flags
            .get(&self.context.active_lane)
            .cloned()
            .unwrap_or_default()
    }

    /// Idle -> Loading. Loads happen once per page.
    pub fn initialize(&mut self) -> Result<FlagRequest, ClientError> {
        if self.state != ClientState::Idle {
            return Err(ClientError::Busy(self.state));
        }
        self.state = ClientState::Loading;
        Ok(FlagRequest::FetchFlags {
            run_id: self.context.run_id.clone(),
        })
    }

    pub fn handle(&mut self, event: FlagEvent) {
        match event {
            FlagEvent::LoadSucceeded(flags) => self.on_load_success(flags),
            FlagEvent::LoadFailed(err) => self.on_load_error(err),
            FlagEvent::SaveSucceeded(echo) => self.on_save_success(echo),
            FlagEvent::SaveFailed(err) => self.on_save_error(err),
        }
    }

    /// Runs `request` to completion against `store` and applies the outcome.
    pub fn dispatch<S: FlagStore + ?Sized>(&mut self, store: &S, request: &FlagRequest) {
        let event = drive(store, request);
        self.handle(event);
    }

    pub fn on_load_success(&mut self, flags: FlagSet) {
        if self.state != ClientState::Loading {
            warn!(state = %self.state, "ignoring unexpected flag load");
            return;
        }
        self.state = ClientState::Loaded;
        self.render(&flags);
        self.flags = flags;
    }

    pub fn on_load_error(&mut self, err: LuiError) {
        if self.state != ClientState::Loading {
            warn!(state = %self.state, "ignoring unexpected flag load failure");
            return;
        }
        warn!(error = %err, "lane flag load failed");
        self.state = ClientState::LoadError;
        self.page.set_panel(Panel::Failure {
            message: failure_message("load", &self.context.run_id),
        });
        self.last_error = Some(err);
    }

    pub fn on_save_success(&mut self, echo: FlagSet) {
        if self.state != ClientState::Saving {
            warn!(state = %self.state, "ignoring unexpected flag save");
            return;
        }
        self.state = ClientState::Loaded;
        self.render(&echo);
        self.page.set_trigger(TriggerControl::idle());
        self.flags.merge(echo);
        self.last_error = None;
    }

    pub fn on_save_error(&mut self, err: LuiError) {
        if self.state != ClientState::Saving {
            warn!(state = %self.state, "ignoring unexpected flag save failure");
            return;
        }
        warn!(error = %err, "lane flag save failed");
        self.state = ClientState::SaveError;
        self.page.set_panel(Panel::Failure {
            message: failure_message("save", &self.context.run_id),
        });
        // Without this the user would have to reload the page to try again.
        self.page.set_trigger(TriggerControl::idle());
        self.last_error = Some(err);
    }

    /// Draws `flags` into the tabs, and for the active lane into the panel and
    /// sidebar. Lanes not in `flags` keep whatever they showed before.
    fn render(&mut self, flags: &FlagSet) {
        for (lane, flag) in flags.iter() {
            let state = flag.state();
            if !self.page.set_tab_state(lane, state) {
                info!(lane, "no tab for lane on this page");
            }

            if lane == self.context.active_lane {
                self.page.set_panel(Panel::Flag(FlagPanel::for_flag(flag)));
                self.page.set_sidebar_state(state);
                self.page.set_trigger(TriggerControl::idle());
            }
        }
    }

    /// Opens the dialog for the active lane and disables the trigger.
    pub fn open_editor(&mut self) -> Result<&mut FlagEditDialog, ClientError> {
        if self.state.in_flight() || self.dialog.is_open() {
            return Err(ClientError::Busy(self.state));
        }
        if !matches!(self.state, ClientState::Loaded | ClientState::SaveError) {
            return Err(ClientError::NotEditable(self.state));
        }
        if !self.page.trigger().is_some_and(|trigger| trigger.enabled) {
            return Err(ClientError::NoFlagPanel(self.context.active_lane.clone()));
        }

        let current = self.active_flag();
        self.page.set_trigger_enabled(false);
        self.dialog.open(&self.context.active_lane, &current);
        Ok(&mut self.dialog)
    }

    pub fn cancel_edit(&mut self) {
        if !self.dialog.is_open() {
            return;
        }
        self.dialog.cancel();
        self.page.set_trigger_enabled(true);
    }

    /// `None` when the dialog refused the submit (no choice made); nothing is
    /// sent in that case and the dialog stays open.
    pub fn submit_edit(&mut self) -> Option<FlagRequest> {
        if self.state.in_flight() {
            return None;
        }
        let DialogDecision::Submit(edit) = self.dialog.submit()? else {
            return None;
        };

        self.state = ClientState::Saving;
        self.page.set_trigger(TriggerControl::saving());
        Some(FlagRequest::PutFlag {
            run_id: self.context.run_id.clone(),
            edit,
        })
    }
}
