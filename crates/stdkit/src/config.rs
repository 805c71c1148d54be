use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use stdkit_base::catcher::run_io;
use stdkit_base::{ResultExt, StdkitError, StdkitResult};
use tracing::{debug, instrument};

use crate::iterator::CsvOptions;
use crate::json::{DEFAULT_MAX_DEPTH, JsonDecoder, JsonEncoder, JsonEncoderOptions};
use crate::transfer::{TransferClient, TransferOption};

/// Settings read from a `stdkit.toml` file. Every section and field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StdkitConfig {
    pub csv: CsvOptions,
    pub json: JsonConfig,
    pub transfer: TransferConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JsonConfig {
    #[serde(flatten)]
    pub options: JsonEncoderOptions,
    /// Nesting limit for both encoding and decoding.
    pub max_depth: u32,
}

impl Default for JsonConfig {
    fn default() -> Self {
        Self {
            options: JsonEncoderOptions::default(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl JsonConfig {
    pub fn encoder(&self) -> StdkitResult<JsonEncoder> {
        let mut encoder = JsonEncoder::with_options(self.options.clone());
        encoder.set_max_depth(self.max_depth)?;
        Ok(encoder)
    }

    pub fn decoder(&self) -> StdkitResult<JsonDecoder> {
        let mut decoder = JsonDecoder::new();
        decoder.set_max_depth(self.max_depth)?;
        Ok(decoder)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    pub timeout_secs: Option<u64>,
    pub user_agent: Option<String>,
    pub follow_redirects: bool,
}

impl TransferConfig {
    /// A client preset with these settings, still lacking a URL.
    pub fn client(&self) -> TransferClient {
        let mut client = TransferClient::new();
        client.set_option(TransferOption::FollowRedirects(self.follow_redirects));
        if let Some(secs) = self.timeout_secs {
            client.set_option(TransferOption::Timeout(Duration::from_secs(secs)));
        }
        if let Some(agent) = &self.user_agent {
            client.set_option(TransferOption::UserAgent(agent.clone()));
        }
        client
    }
}

/// Reads and parses a TOML configuration file.
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn load_config(path: impl AsRef<Path>) -> StdkitResult<StdkitConfig> {
    let path = path.as_ref();
    let text = run_io(path, || std::fs::read_to_string(path))
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let config = toml::from_str(&text).map_err(|e| {
        Box::new(StdkitError::message(format!(
            "Failed to parse config {}: {}",
            path.display(),
            e.message()
        )))
    })?;
    debug!("loaded config");
    Ok(config)
}
