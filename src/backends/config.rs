//! Declarative engine configuration.
//!
//! This module lets callers describe their engine fleet as data (JSON
//! or built in code) and resolve each entry to a working adapter. An
//! entry that cannot be resolved becomes an [`UnsupportedEngine`] so
//! every configured engine still appears in each item's verdict map.

use crate::backends::http::HttpEngine;
use crate::backends::local::LocalProcessEngine;
use crate::backends::unsupported::UnsupportedEngine;
use crate::core::traits::ArcEngine;

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

fn default_local_args() -> Vec<String> {
    // clamdscan conventions; other scanners override.
    vec!["-r".to_string(), "--fdpass".to_string()]
}

fn default_local_timeout_secs() -> u64 {
    300
}

fn default_field_name() -> String {
    "malware".to_string()
}

fn default_http_timeout_secs() -> u64 {
    30
}

/// One configured engine: a name plus transport settings.
///
/// # Examples
///
/// Decoding from JSON:
///
/// ```rust
/// use fileward::backends::EngineConfig;
///
/// let config: EngineConfig = serde_json::from_str(
///     r#"{"name": "clamav", "kind": "local_process", "command": "clamdscan"}"#,
/// ).unwrap();
/// let engine = config.build();
/// assert_eq!(engine.name(), "clamav");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Unique engine name, used to key verdicts and audit records.
    pub name: String,

    /// Transport-specific settings.
    #[serde(flatten)]
    pub settings: EngineSettings,
}

/// Transport settings for one engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EngineSettings {
    /// A scanner invoked as a local command.
    LocalProcess {
        /// Command to invoke; resolved via `PATH` unless absolute.
        command: String,

        /// Arguments placed before the target path. Defaults to
        /// `["-r", "--fdpass"]`, the clamdscan idiom.
        #[serde(default = "default_local_args")]
        args: Vec<String>,

        /// Per-scan deadline in seconds.
        #[serde(default = "default_local_timeout_secs")]
        timeout_secs: u64,
    },

    /// A scanning service reached over HTTP multipart upload.
    RemoteHttp {
        /// Endpoint URL the upload is POSTed to.
        endpoint: String,

        /// Multipart field name the service expects.
        #[serde(default = "default_field_name")]
        field_name: String,

        /// Per-request deadline in seconds.
        #[serde(default = "default_http_timeout_secs")]
        timeout_secs: u64,
    },
}

impl EngineConfig {
    /// Creates a local-process entry with default arguments and timeout.
    pub fn local_process(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            settings: EngineSettings::LocalProcess {
                command: command.into(),
                args: default_local_args(),
                timeout_secs: default_local_timeout_secs(),
            },
        }
    }

    /// Creates a remote-HTTP entry with default field name and timeout.
    pub fn remote_http(name: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            settings: EngineSettings::RemoteHttp {
                endpoint: endpoint.into(),
                field_name: default_field_name(),
                timeout_secs: default_http_timeout_secs(),
            },
        }
    }

    /// Resolves this entry to a working adapter.
    ///
    /// Resolution never fails: an entry whose adapter cannot be
    /// constructed yields an [`UnsupportedEngine`] under the same name,
    /// which marks every item it sees with an unsupported verdict.
    pub fn build(self) -> ArcEngine {
        match self.settings {
            EngineSettings::LocalProcess {
                command,
                args,
                timeout_secs,
            } => Arc::new(
                LocalProcessEngine::new(self.name, command)
                    .with_args(args)
                    .with_timeout(Duration::from_secs(timeout_secs)),
            ),
            EngineSettings::RemoteHttp {
                endpoint,
                field_name,
                timeout_secs,
            } => match HttpEngine::new(self.name.clone(), &endpoint) {
                Ok(engine) => Arc::new(
                    engine
                        .with_field_name(field_name)
                        .with_timeout(Duration::from_secs(timeout_secs)),
                ),
                Err(err) => {
                    tracing::warn!(
                        engine = %self.name,
                        endpoint = %endpoint,
                        error = %err,
                        "engine could not be resolved, substituting unsupported stand-in"
                    );
                    Arc::new(UnsupportedEngine::new(self.name, err.to_string()))
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_process_decodes_with_defaults() {
        let config: EngineConfig = serde_json::from_str(
            r#"{"name": "clamav", "kind": "local_process", "command": "clamdscan"}"#,
        )
        .unwrap();
        assert_eq!(config.name, "clamav");
        match &config.settings {
            EngineSettings::LocalProcess {
                command,
                args,
                timeout_secs,
            } => {
                assert_eq!(command, "clamdscan");
                assert_eq!(args, &["-r".to_string(), "--fdpass".to_string()]);
                assert_eq!(*timeout_secs, 300);
            }
            other => panic!("wrong settings: {other:?}"),
        }
    }

    #[test]
    fn remote_http_decodes_with_defaults() {
        let config: EngineConfig = serde_json::from_str(
            r#"{"name": "escan", "kind": "remote_http", "endpoint": "http://av.local/scan"}"#,
        )
        .unwrap();
        match &config.settings {
            EngineSettings::RemoteHttp {
                endpoint,
                field_name,
                timeout_secs,
            } => {
                assert_eq!(endpoint, "http://av.local/scan");
                assert_eq!(field_name, "malware");
                assert_eq!(*timeout_secs, 30);
            }
            other => panic!("wrong settings: {other:?}"),
        }
    }

    #[test]
    fn build_resolves_local_process() {
        let engine = EngineConfig::local_process("clamav", "clamdscan").build();
        assert_eq!(engine.name(), "clamav");
        assert_eq!(engine.scan_timeout(), Duration::from_secs(300));
    }

    #[test]
    fn build_resolves_remote_http() {
        let engine = EngineConfig::remote_http("escan", "http://av.local/scan").build();
        assert_eq!(engine.name(), "escan");
        assert_eq!(engine.scan_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn round_trips_through_json() {
        let config = EngineConfig::remote_http("escan", "http://av.local/scan");
        let json = serde_json::to_string(&config).unwrap();
        let back: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.name, "escan");
    }
}
