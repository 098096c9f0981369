//! Resolved client configuration consumed by the pipeline.
//!
//! The core never reads ambient process state (environment variables, proxy
//! settings); collaborators hand it a fully resolved [`ClientConfig`], and
//! transport-level configuration belongs to the transport collaborator's own
//! constructor.

use crate::{Error, Result};
use flowline::{CodecMode, ROOT_ENDPOINT};
use serde::{Deserialize, Serialize};

/// Configuration for one [`RequestPipeline`](crate::RequestPipeline).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Number of input items grouped into one request. Minimum 1.
    pub batch_size: usize,
    /// Codec mode applied to every array field.
    pub codec_mode: CodecMode,
    /// Target endpoint identifier.
    pub endpoint: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            batch_size: 1,
            codec_mode: CodecMode::None,
            endpoint: ROOT_ENDPOINT.to_owned(),
        }
    }
}

impl ClientConfig {
    /// Checks configuration invariants.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if `batch_size` is zero.
    pub fn validated(self) -> Result<Self> {
        if self.batch_size == 0 {
            return Err(Error::Validation {
                reason: "batch_size must be at least 1".to_owned(),
            });
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_minimal() {
        let config = ClientConfig::default();
        assert_eq!(config.batch_size, 1);
        assert_eq!(config.codec_mode, CodecMode::None);
        assert_eq!(config.endpoint, "/");
        assert!(config.validated().is_ok());
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let config = ClientConfig {
            batch_size: 0,
            ..ClientConfig::default()
        };
        assert!(matches!(
            config.validated(),
            Err(Error::Validation { .. })
        ));
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: ClientConfig = serde_json::from_str(r#"{"batch_size": 3}"#).unwrap();
        assert_eq!(config.batch_size, 3);
        assert_eq!(config.endpoint, "/");
    }
}
