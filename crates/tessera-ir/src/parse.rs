use crate::types::{TestModel, TestResult};

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Parse a test model document. Model validation failures surface as
/// JSON errors carrying the [`crate::types::ModelError`] message.
pub fn parse_model(json: &str) -> Result<TestModel, ParseError> {
    Ok(serde_json::from_str(json)?)
}

pub fn parse_result(json: &str) -> Result<TestResult, ParseError> {
    Ok(serde_json::from_str(json)?)
}
