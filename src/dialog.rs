use serde::Serialize;
use tracing::debug;

use crate::model::{Flag, FlagEdit};

pub const USABLE_LABEL_TEXT: &str = "Usable?";
const BASE_FONT_WEIGHT: u32 = 400;
const BASE_FONT_SIZE_PX: u32 = 14;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogDecision {
    Submit(FlagEdit),
    Cancel,
}

/// The "Usable?" prompt. It grows louder every time the user tries to submit
/// without picking Yes or No.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsableLabel {
    pub text: String,
    pub font_weight: u32,
    pub font_size_px: u32,
}

impl Default for UsableLabel {
    fn default() -> Self {
        Self {
            text: USABLE_LABEL_TEXT.to_string(),
            font_weight: BASE_FONT_WEIGHT,
            font_size_px: BASE_FONT_SIZE_PX,
        }
    }
}

impl UsableLabel {
    fn nudge(&mut self) {
        self.text.push('?');
        self.font_weight += 200;
        self.font_size_px += 1;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct DialogFields {
    yes: bool,
    no: bool,
    reason: String,
}

/// Editor for one lane's flag: a Yes/No chooser that may be left unset, plus
/// free-text remarks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlagEditDialog {
    lane: Option<String>,
    title: String,
    yes: bool,
    no: bool,
    reason: String,
    label: UsableLabel,
    open: bool,
    snapshot: Option<DialogFields>,
}

impl FlagEditDialog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shows the dialog pre-populated from `current`, remembering those values
    /// so that cancel can put them back.
    pub fn open(&mut self, lane: &str, current: &Flag) {
        self.lane = Some(lane.to_string());
        self.title = format!("Is lane {} usable?", lane_number(lane));
        self.yes = current.qc == Some(true);
        self.no = current.qc == Some(false);
        self.reason = current.reason.clone().unwrap_or_default();
        self.snapshot = Some(self.fields());
        self.open = true;
        debug!(lane, "opened flag dialog");
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn label(&self) -> &UsableLabel {
        &self.label
    }

    /// `Some(true)` ticks Yes, `Some(false)` ticks No, `None` clears both.
    pub fn choose(&mut self, qc: Option<bool>) {
        self.yes = qc == Some(true);
        self.no = qc == Some(false);
    }

    pub fn choice(&self) -> Option<bool> {
        match (self.yes, self.no) {
            (true, _) => Some(true),
            (false, true) => Some(false),
            (false, false) => None,
        }
    }

    pub fn set_reason(&mut self, reason: impl Into<String>) {
        self.reason = reason.into();
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Closes the dialog and restores the values it was opened with.
    pub fn cancel(&mut self) -> DialogDecision {
        if let Some(snapshot) = self.snapshot.take() {
            self.yes = snapshot.yes;
            self.no = snapshot.no;
            self.reason = snapshot.reason;
        }
        self.open = false;
        DialogDecision::Cancel
    }

    /// `None` means the submit was refused locally: either the dialog is not
    /// open or no Yes/No choice has been made.
    pub fn submit(&mut self) -> Option<DialogDecision> {
        if !self.open {
            return None;
        }
        let Some(qc) = self.choice() else {
            self.label.nudge();
            debug!(label = %self.label.text, "flag dialog submitted without a choice");
            return None;
        };
        let lane = self.lane.clone()?;

        self.open = false;
        self.snapshot = None;
        Some(DialogDecision::Submit(FlagEdit {
            lane,
            qc,
            reason: self.reason.clone(),
        }))
    }

    fn fields(&self) -> DialogFields {
        DialogFields {
            yes: self.yes,
            no: self.no,
            reason: self.reason.clone(),
        }
    }
}

fn lane_number(lane: &str) -> &str {
    lane.strip_prefix("lane")
        .filter(|rest| !rest.is_empty())
        .unwrap_or(lane)
}
