use thiserror::Error;

/// Error surfaced at the binary boundary: a message plus the process exit code.
#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

/// Failures of the rate table core (load, validation, derivation).
///
/// `Clone` so a cached load result can be handed out more than once.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TableError {
    /// The table could not be fetched or decoded at all.
    #[error("Failed to load rate table from {origin}: {reason}")]
    LoadFailure { origin: String, reason: String },

    /// The table loaded fine but holds no observations.
    #[error("Rate table has no rows.")]
    EmptyTable,

    /// A row (or the header) does not match the series schema.
    #[error("Schema violation{}: {message}", fmt_line(.line))]
    SchemaViolation { line: Option<usize>, message: String },
}

impl TableError {
    pub fn load_failure(origin: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::LoadFailure {
            origin: origin.into(),
            reason: reason.into(),
        }
    }

    pub fn schema(line: Option<usize>, message: impl Into<String>) -> Self {
        Self::SchemaViolation {
            line,
            message: message.into(),
        }
    }
}

fn fmt_line(line: &Option<usize>) -> String {
    line.map(|l| format!(" at line {l}")).unwrap_or_default()
}

impl From<TableError> for AppError {
    fn from(err: TableError) -> Self {
        let exit_code = match &err {
            TableError::SchemaViolation { .. } => 2,
            TableError::EmptyTable => 3,
            TableError::LoadFailure { .. } => 4,
        };
        AppError::new(exit_code, err.to_string())
    }
}
