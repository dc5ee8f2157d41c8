//! Widgets API payloads.

use serde::{Deserialize, Serialize};

/// A widget to create.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidgetCreate {
    /// Widget name.
    pub name: String,
    /// Height, with units.
    #[serde(default)]
    pub height: Option<String>,
    /// Mass, with units.
    #[serde(default)]
    pub mass: Option<String>,
    /// Force.
    #[serde(default)]
    pub force: Option<i64>,
}

impl WidgetCreate {
    /// A widget called `name` with no measurements.
    pub fn named<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// A stored widget.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidgetRead {
    /// Widget ID.
    pub id: i64,
    /// Widget name.
    pub name: String,
    /// Height, with units.
    #[serde(default)]
    pub height: Option<String>,
    /// Mass, with units.
    #[serde(default)]
    pub mass: Option<String>,
    /// Force.
    #[serde(default)]
    pub force: Option<i64>,
}

/// Request to start a zap task on a widget.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidgetZap {
    /// How long to zap for, in seconds.
    #[serde(default = "default_zap_duration")]
    pub duration: i64,
}

fn default_zap_duration() -> i64 {
    10
}

impl Default for WidgetZap {
    fn default() -> Self {
        Self {
            duration: default_zap_duration(),
        }
    }
}

/// Status of a zap task.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidgetZapTask {
    /// Task UUID.
    pub uuid: String,
    /// Task state, `UNKNOWN` when not reported.
    #[serde(default = "default_state")]
    pub state: String,
    /// ID of the zapped widget.
    pub id: i64,
    /// Requested duration, in seconds.
    pub duration: i64,
    /// Seconds the task has run so far.
    pub runtime: i64,
}

fn default_state() -> String {
    "UNKNOWN".to_string()
}
