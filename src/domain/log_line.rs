//! Classification of backend agent log lines
//!
//! Each line returned by `/simulate` lands in two places: the timeline
//! (final vs. in-progress) and the console (severity level).

/// Console severity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleLevel {
    Info,
    Warn,
    Success,
    Error,
}

impl ConsoleLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsoleLevel::Info => "INFO",
            ConsoleLevel::Warn => "WARN",
            ConsoleLevel::Success => "SUCCESS",
            ConsoleLevel::Error => "ERROR",
        }
    }
}

/// Timeline stage of a log line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimelineStage {
    /// Incident consolidated (created or merged)
    Final,
    /// Still being processed
    Active,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogClass {
    pub level: ConsoleLevel,
    pub stage: TimelineStage,
}

/// Classify a backend log line.
///
/// `Action:` outranks `Rejected` when a line carries both.
pub fn classify(line: &str) -> LogClass {
    let level = if line.contains("Action:") {
        ConsoleLevel::Success
    } else if line.contains("Rejected") {
        ConsoleLevel::Warn
    } else {
        ConsoleLevel::Info
    };

    let stage = if line.contains("Action: MERGED") || line.contains("Action: CREATED") {
        TimelineStage::Final
    } else {
        TimelineStage::Active
    };

    LogClass { level, stage }
}
