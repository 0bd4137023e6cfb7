//! Record kinds and their fixed CSV schemas.

/// Column order of the per-participant dots task log.
pub const TRIAL_COLUMNS: &[&str] = &[
    "participant",
    "age",
    "gender",
    "main",
    "block",
    "block_type",
    "scenario",
    "trial_global",
    "trial_in_scenario",
    "left_dot_count",
    "right_dot_count",
    "correct_side",
    "response",
    "correct",
    "response_time",
    "initial_confidence",
    "confidence_rt",
    "partner_response",
    "partner_confidence",
    "partner_agreed",
    "decision",
    "decision_rt",
    "final_confidence",
    "final_confidence_rt",
    "conf_update",
    "change",
    "button_location",
    "dot_delta",
    "new_delta",
    "recent_performance",
    "cumulative_accuracy",
    "reversal_count",
    "consecutive_correct",
    "consecutive_incorrect",
];

/// Column order of the per-participant scenario log.
pub const SCENARIO_COLUMNS: &[&str] = &[
    "participant",
    "block",
    "block_type",
    "scenario",
    "scenario_response",
];

/// Shared JSON-lines log for end-of-session payloads.
pub const COMPLETION_LOG: &str = "completion_log.txt";

/// The `data_type` values the store knows how to persist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Trial,
    Scenario,
    Completion,
}

impl RecordKind {
    /// Parse a wire `data_type`. Unknown values yield `None`.
    pub fn parse(data_type: &str) -> Option<Self> {
        match data_type {
            "trial" => Some(RecordKind::Trial),
            "scenario" => Some(RecordKind::Scenario),
            "completion" => Some(RecordKind::Completion),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Trial => "trial",
            RecordKind::Scenario => "scenario",
            RecordKind::Completion => "completion",
        }
    }

    /// CSV header for kinds that are written as tables.
    pub fn columns(&self) -> Option<&'static [&'static str]> {
        match self {
            RecordKind::Trial => Some(TRIAL_COLUMNS),
            RecordKind::Scenario => Some(SCENARIO_COLUMNS),
            RecordKind::Completion => None,
        }
    }

    /// Name of the file a record of this kind lands in.
    pub fn file_name(&self, participant_id: &str) -> String {
        match self {
            RecordKind::Trial => format!("participant_{}_dots.csv", participant_id),
            RecordKind::Scenario => format!("participant_{}_scenarios.csv", participant_id),
            RecordKind::Completion => COMPLETION_LOG.to_string(),
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
