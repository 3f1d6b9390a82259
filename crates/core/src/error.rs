#[derive(Debug, thiserror::Error)]
pub enum CdsError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("unknown contraceptive method: {0}")]
    UnknownMethod(String),
    #[error("unknown symptom: {0}")]
    UnknownSymptom(String),
    #[error("category must be between 1 and 4, got {0}")]
    InvalidCategory(u8),
    #[error("expected a {expected} answer, received {received}")]
    AnswerMismatch {
        expected: &'static str,
        received: &'static str,
    },
    #[error("triage session has already produced a recommendation")]
    SessionComplete,
    #[error("eligibility table schema mismatch: {0}")]
    TableSchema(String),
    #[error("invalid YAML: {0}")]
    InvalidYaml(#[from] serde_yaml::Error),
}

pub type CdsResult<T> = std::result::Result<T, CdsError>;
