//! Image analysis: prompt, one model call, normalized records.

use indexmap::IndexMap;
use serde_json::Value;
use std::time::Instant;
use tracing::{debug, info};

use crate::data_uri::DecodedImage;
use crate::error::CalcError;
use crate::normalizer;
use crate::prompt;
use crate::types::AnalysisRecord;
use crate::vision_client::VisionClient;

/// Analyze a decoded canvas image.
///
/// Model and transport failures are returned as errors. A reply that cannot
/// be parsed is not an error: it yields an empty list.
pub async fn analyze_image(
    client: &dyn VisionClient,
    image: &DecodedImage,
    dict_of_vars: &IndexMap<String, Value>,
) -> Result<Vec<AnalysisRecord>, CalcError> {
    let prompt = prompt::build_prompt(dict_of_vars);
    let started = Instant::now();

    let reply = client.generate(&prompt, image).await?;
    debug!("Raw reply from {}: {}", client.model(), reply);

    let records = normalizer::normalize_reply(&reply);
    info!(
        "Analyzed {}x{} image with {} in {}ms: {} record(s)",
        image.width,
        image.height,
        client.model(),
        started.elapsed().as_millis(),
        records.len()
    );
    Ok(records)
}
