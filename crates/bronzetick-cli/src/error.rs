use bronzetick_core::{
    AnalyticsError, ConfigError, JobError, SampleSizeError, ValidationError, WarehouseError,
};
use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
///
/// | code | category |
/// |------|----------|
/// | 2 | invalid input or command failure |
/// | 3 | missing or malformed configuration |
/// | 4 | store cannot be opened |
/// | 5 | JSON serialization |
/// | 6 | store query or write |
/// | 7 | job could not persist or export its batch |
/// | 9 | `--strict` with failures or warnings |
/// | 10 | I/O |
///
/// Provider errors never reach this level: jobs record them per entity.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("command error: {0}")]
    Command(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{0}")]
    StoreUnreachable(String),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error("store error: {0}")]
    Store(WarehouseError),

    #[error(transparent)]
    Job(JobError),

    #[error("strict mode failed: failures={failure_count}, warnings={warning_count}")]
    StrictModeViolation {
        failure_count: usize,
        warning_count: usize,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) | Self::Command(_) => 2,
            Self::Config(_) => 3,
            Self::StoreUnreachable(_) => 4,
            Self::Serialization(_) => 5,
            Self::Store(_) => 6,
            Self::Job(_) => 7,
            Self::StrictModeViolation { .. } => 9,
            Self::Io(_) => 10,
        }
    }
}

impl From<WarehouseError> for CliError {
    fn from(error: WarehouseError) -> Self {
        match error {
            WarehouseError::Unreachable { .. } => Self::StoreUnreachable(error.to_string()),
            other => Self::Store(other),
        }
    }
}

impl From<JobError> for CliError {
    fn from(error: JobError) -> Self {
        match error {
            JobError::StoreUnreachable(_) => Self::StoreUnreachable(error.to_string()),
            other => Self::Job(other),
        }
    }
}

impl From<AnalyticsError> for CliError {
    fn from(error: AnalyticsError) -> Self {
        Self::Command(error.to_string())
    }
}

impl From<SampleSizeError> for CliError {
    fn from(error: SampleSizeError) -> Self {
        match error {
            SampleSizeError::Invalid(validation) => Self::Validation(validation),
            SampleSizeError::Numeric(message) => Self::Command(message),
        }
    }
}
