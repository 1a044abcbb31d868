//! Shared library for the sketch calculator relay.
//!
//! Everything except HTTP plumbing lives here: request/response types,
//! configuration, data-URI decoding, the Gemini client and the reply
//! normalizer.

pub mod analyzer;
pub mod config;
pub mod data_uri;
pub mod error;
pub mod literal;
pub mod normalizer;
pub mod prompt;
pub mod types;
pub mod vision_client;

pub use analyzer::analyze_image;
pub use config::{CalcConfig, Environment, GeminiConfig};
pub use data_uri::{decode_data_uri, DataUriError, DecodedImage};
pub use error::CalcError;
pub use normalizer::normalize_reply;
pub use types::{
    AnalysisRecord, CalculateResponse, CheckResponse, ImageData, ResponseStatus, RootResponse,
};
pub use vision_client::{FakeVisionClient, GeminiVisionClient, VisionClient, VisionError};
