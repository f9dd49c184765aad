use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One lane's usability flag as stored in the LIMS.
///
/// `qc` is tri-state: `None` means nobody has decided yet. No coupling between
/// `qc` and `reason` is enforced here or anywhere else.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flag {
    #[serde(rename = "Lane QC", default)]
    pub qc: Option<bool>,
    #[serde(rename = "Fail Details", default)]
    pub reason: Option<String>,
}

impl Flag {
    pub fn state(&self) -> QcState {
        QcState::from(self.qc)
    }

    pub fn qc_label(&self) -> &'static str {
        self.state().label()
    }

    /// Reason text worth showing; empty strings count as absent.
    pub fn reason_text(&self) -> Option<&str> {
        self.reason.as_deref().filter(|reason| !reason.is_empty())
    }
}

/// Lane label -> flag for a single run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlagSet {
    lanes: BTreeMap<String, Flag>,
}

impl FlagSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(lane: impl Into<String>, flag: Flag) -> Self {
        let mut set = Self::new();
        set.insert(lane, flag);
        set
    }

    pub fn insert(&mut self, lane: impl Into<String>, flag: Flag) {
        self.lanes.insert(lane.into(), flag);
    }

    pub fn get(&self, lane: &str) -> Option<&Flag> {
        self.lanes.get(lane)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Flag)> {
        self.lanes.iter().map(|(lane, flag)| (lane.as_str(), flag))
    }

    pub fn len(&self) -> usize {
        self.lanes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lanes.is_empty()
    }

    /// Patch semantics: lanes in `other` replace ours, everything else stays.
    pub fn merge(&mut self, other: FlagSet) {
        self.lanes.extend(other.lanes);
    }
}

/// A submitted edit for one lane. Once submitted the flag is always decided.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlagEdit {
    pub lane: String,
    pub qc: bool,
    pub reason: String,
}

impl FlagEdit {
    pub fn flag(&self) -> Flag {
        Flag {
            qc: Some(self.qc),
            reason: Some(self.reason.clone()),
        }
    }

    /// The body sent to the store, which merges it into the run's flags.
    pub fn to_flag_set(&self) -> FlagSet {
        FlagSet::single(self.lane.clone(), self.flag())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QcState {
    True,
    False,
    Null,
}

impl QcState {
    pub fn as_class(self) -> &'static str {
        match self {
            Self::True => "lui_state_true",
            Self::False => "lui_state_false",
            Self::Null => "lui_state_null",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::True => "Yes",
            Self::False => "No",
            Self::Null => "Not Set",
        }
    }
}

impl From<Option<bool>> for QcState {
    fn from(qc: Option<bool>) -> Self {
        match qc {
            Some(true) => Self::True,
            Some(false) => Self::False,
            None => Self::Null,
        }
    }
}

impl fmt::Display for QcState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_class())
    }
}

/// Human label for a raw `"Lane QC"` value. Anything that is not a bool or
/// null is passed through as-is.
pub fn qc_label(value: &Value) -> Cow<'_, str> {
    match value {
        Value::Bool(qc) => Cow::Borrowed(QcState::from(Some(*qc)).label()),
        Value::Null => Cow::Borrowed(QcState::Null.label()),
        Value::String(text) => Cow::Borrowed(text.as_str()),
        other => Cow::Owned(other.to_string()),
    }
}
