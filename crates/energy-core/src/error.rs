use thiserror::Error;

/// All errors produced by the analysis engine.
///
/// The first four variants are the fatal taxonomy surfaced to callers; each
/// carries a stable [`code`](AnalysisError::code) so transport layers can
/// distinguish them without string matching. Row-level parse problems are
/// never errors: they are recorded into the report's `notes` list and
/// processing continues.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// The input structure is unreadable, or rows reference more than one
    /// distinct meter identifier.
    #[error("Invalid input format: {0}")]
    Format(String),

    /// Too little usable data remained after filtering bad rows.
    #[error("Insufficient data: only {hours} hours of readings after filtering (need {needed})")]
    InsufficientData { hours: usize, needed: usize },

    /// Too many hours of the normalized grid had no readings at all.
    #[error("Low quality data: {:.1}% of hours are missing", .missing_fraction * 100.0)]
    LowQualityData { missing_fraction: f64 },

    /// An internal cross-field invariant of the assembled report was
    /// violated. Always a bug signal; never suppressed.
    #[error("Report validation failed: {0}")]
    ReportValidation(String),

    /// The caller cancelled the run (e.g. the client disconnected).
    #[error("Analysis cancelled by caller")]
    Cancelled,

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The input file could not be read at all.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl AnalysisError {
    /// Stable machine-readable code distinguishing the error kinds.
    pub fn code(&self) -> &'static str {
        match self {
            AnalysisError::Format(_) => "format",
            AnalysisError::InsufficientData { .. } => "insufficient_data",
            AnalysisError::LowQualityData { .. } => "low_quality_data",
            AnalysisError::ReportValidation(_) => "report_validation",
            AnalysisError::Cancelled => "cancelled",
            AnalysisError::Config(_) => "config",
            AnalysisError::Io(_) => "io",
        }
    }
}

/// Convenience alias used throughout the engine crates.
pub type Result<T> = std::result::Result<T, AnalysisError>;
