use thiserror::Error;

#[derive(Error, Debug)]
pub enum HerdbookError {
    #[error("Data error: {0}")]
    Data(String),

    #[error("Pedigree error: {0}")]
    Pedigree(String),

    #[error("Invalid {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Animal '{0}' not found")]
    NotFound(String),

    #[error("Pedigree level {level} exceeds the supported maximum of {max}")]
    InvalidLevel { level: u32, max: u32 },

    #[error("Fetch failed after {attempts} attempt(s): {message}")]
    Fetch { attempts: u32, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl HerdbookError {
    /// Whether asking again could succeed. Missing animals and rejected
    /// input will fail the same way on every attempt.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            HerdbookError::NotFound(_)
                | HerdbookError::Validation { .. }
                | HerdbookError::InvalidLevel { .. }
        )
    }

    /// Short text suitable for a user-facing notification.
    pub fn user_message(&self) -> String {
        match self {
            HerdbookError::Validation { field, message } => format!("{}: {}", field, message),
            HerdbookError::NotFound(id) => format!("Animal '{}' could not be found", id),
            HerdbookError::InvalidLevel { max, .. } => {
                format!("Pedigree depth is limited to {} generations", max)
            }
            HerdbookError::Fetch { message, .. } => message.clone(),
            HerdbookError::Io(_) | HerdbookError::Csv(_) | HerdbookError::Json(_) => {
                "Could not read the animal records".to_string()
            }
            HerdbookError::Data(msg) | HerdbookError::Pedigree(msg) => msg.clone(),
        }
    }
}

pub type Result<T> = std::result::Result<T, HerdbookError>;
