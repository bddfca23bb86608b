use anyhow::{bail, Result};
use base64::Engine;
use tracing::debug;

use super::manager::RawCapture;

/// Turns drained recorder output into the string payload handed to the
/// activation callback
#[async_trait::async_trait]
pub trait PayloadEncoder: Send + Sync {
    async fn encode(&self, raw: RawCapture) -> Result<String>;
}

/// Encodes the capture as a `data:<mime>;base64,<bytes>` URI
#[derive(Debug, Clone, Copy, Default)]
pub struct DataUriEncoder;

#[async_trait::async_trait]
impl PayloadEncoder for DataUriEncoder {
    async fn encode(&self, raw: RawCapture) -> Result<String> {
        if raw.is_empty() {
            bail!("capture produced no media");
        }

        let bytes = raw.to_bytes();
        let body = base64::engine::general_purpose::STANDARD.encode(&bytes);

        debug!(
            "Encoded {} chunks ({} bytes) as {}",
            raw.chunks.len(),
            bytes.len(),
            raw.mime_type
        );

        Ok(format!("data:{};base64,{}", raw.mime_type, body))
    }
}
