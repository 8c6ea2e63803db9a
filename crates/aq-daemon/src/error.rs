// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error classification for the Heartbeat boundary (spec.md §7). The
//! Scheduler and its dependencies already carry precise `thiserror` enums;
//! this module just buckets them into the four kinds spec.md names so the
//! Heartbeat can log and emit with a consistent `kind` field, not to build
//! a second parallel error type.

use aq_scheduler::SchedulerError;

/// One of spec.md §7's four error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Transient,
    Permanent,
    Warning,
    Programmer,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transient => "transient",
            Self::Permanent => "permanent",
            Self::Warning => "warning",
            Self::Programmer => "programmer",
        }
    }
}

/// Classify a [`SchedulerError`] surfaced from a beat phase. Scheduler-
/// internal retry bookkeeping already happened before this error reached
/// us — this only decides how loudly the Heartbeat should log it.
pub fn classify(error: &SchedulerError) -> FailureKind {
    match error {
        SchedulerError::Assessment(_) | SchedulerError::Vcs(_) | SchedulerError::Agent(_) => {
            FailureKind::Transient
        }
        SchedulerError::Event(_) => FailureKind::Warning,
        SchedulerError::Store(_) => FailureKind::Programmer,
        SchedulerError::MissingProject(_, _) => FailureKind::Programmer,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aq_adapters::AssessmentError;

    #[test]
    fn assessment_failures_are_transient() {
        let error = SchedulerError::Assessment(AssessmentError::Malformed("bad json".to_string()));
        assert_eq!(classify(&error), FailureKind::Transient);
    }

    #[test]
    fn missing_project_is_a_programmer_error() {
        let error = SchedulerError::MissingProject("tsk-1".to_string(), "prj-1".to_string());
        assert_eq!(classify(&error), FailureKind::Programmer);
    }
}
