//! Error types for the calculator relay.

use thiserror::Error;

use crate::data_uri::DataUriError;
use crate::vision_client::VisionError;

/// Everything that can fail while serving one `/calculate` request.
///
/// The HTTP layer collapses all variants into a single error envelope, so
/// the Display text is what the client sees.
#[derive(Error, Debug)]
pub enum CalcError {
    #[error("Invalid image payload: {0}")]
    Image(#[from] DataUriError),

    #[error("Gemini API error: {0}")]
    Vision(#[from] VisionError),

    #[error("Invalid request body: {0}")]
    Request(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
