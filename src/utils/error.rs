use thiserror::Error;

#[derive(Error, Debug)]
pub enum CeaError {
    #[error("Dimension mismatch in {context}: expected {expected}, got {actual}")]
    DimensionMismatch {
        context: String,
        expected: usize,
        actual: usize,
    },

    #[error("Length mismatch: {values} values but {times} time indices")]
    LengthMismatch { values: usize, times: usize },

    #[error("Empty input: {context}")]
    EmptyInput { context: String },

    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Processing error: {message}")]
    ProcessingError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Usage,
    Configuration,
    Io,
    Serialization,
    Processing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Medium,
    High,
    Critical,
}

impl CeaError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            CeaError::DimensionMismatch { .. }
            | CeaError::LengthMismatch { .. }
            | CeaError::EmptyInput { .. } => ErrorCategory::Usage,
            CeaError::ConfigValidationError { .. }
            | CeaError::InvalidConfigValueError { .. }
            | CeaError::MissingConfigError { .. } => ErrorCategory::Configuration,
            CeaError::IoError(_) => ErrorCategory::Io,
            CeaError::ZipError(_) | CeaError::CsvError(_) | CeaError::SerializationError(_) => {
                ErrorCategory::Serialization
            }
            CeaError::ProcessingError { .. } => ErrorCategory::Processing,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Usage | ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::Serialization | ErrorCategory::Processing => ErrorSeverity::Medium,
            ErrorCategory::Io => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            CeaError::DimensionMismatch { .. } => {
                "Make sure the initial vector, transition matrices and state weights all have one entry per health state"
            }
            CeaError::LengthMismatch { .. } => {
                "Supply exactly one time index for every value being discounted"
            }
            CeaError::EmptyInput { .. } => "Provide at least one health state and one transition matrix",
            CeaError::ConfigValidationError { .. }
            | CeaError::InvalidConfigValueError { .. }
            | CeaError::MissingConfigError { .. } => {
                "Check the model TOML file against the documented sections and fix the reported field"
            }
            CeaError::IoError(_) => "Check that the paths exist and that you have read/write permission",
            CeaError::ZipError(_) | CeaError::CsvError(_) | CeaError::SerializationError(_) => {
                "Retry the run; if it keeps failing, disable the bundle option or the failing output format"
            }
            CeaError::ProcessingError { .. } => "Re-run with --verbose to see which strategy failed",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Usage => format!("The model inputs do not fit together: {}", self),
            ErrorCategory::Configuration => format!("The model configuration is invalid: {}", self),
            ErrorCategory::Io => format!("Could not read or write a file: {}", self),
            ErrorCategory::Serialization => format!("Could not write the analysis outputs: {}", self),
            ErrorCategory::Processing => format!("The analysis failed: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, CeaError>;
