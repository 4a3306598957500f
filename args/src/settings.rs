// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The optional YAML settings file.
//!
//! ```yaml
//! lossless:
//!   trust: dscp
//!   pfc: "00010000"
//!   traffic_class: "Global tclass=106"
//!   tcp_ecn: "1"
//!   rdma_cm_tos: "106"
//! temperature:
//!   warning: 80
//!   error: 90
//! record_dir: /tmp/lshca
//! ```
//!
//! Every key is optional; missing keys keep their built in default.

use hardware::field::TemperatureThresholds;
use probe::LosslessBaseline;
use std::path::{Path, PathBuf};

/// Overrides of the lossless RoCE baseline.
#[derive(Clone, Debug, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct LosslessSettings {
    pub trust: Option<String>,
    pub pfc: Option<String>,
    pub traffic_class: Option<String>,
    pub tcp_ecn: Option<String>,
    pub rdma_cm_tos: Option<String>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct TemperatureSettings {
    pub warning: Option<i32>,
    pub error: Option<i32>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub lossless: LosslessSettings,
    pub temperature: TemperatureSettings,
    pub record_dir: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum SettingsError {
    #[error("failed to read settings file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid settings file {path}")]
    #[diagnostic(help("see the lshca-args documentation for the settings file format"))]
    Syntax {
        path: PathBuf,
        #[source]
        source: serde_yaml_ng::Error,
    },
}

impl Settings {
    /// # Errors
    ///
    /// Fails if the file can not be read or is not a valid settings document.
    pub fn load(path: &Path) -> Result<Settings, SettingsError> {
        let text = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Settings::parse(&text).map_err(|source| SettingsError::Syntax {
            path: path.to_path_buf(),
            source,
        })
    }

    /// # Errors
    ///
    /// Fails if `text` is not a valid settings document.
    pub fn parse(text: &str) -> Result<Settings, serde_yaml_ng::Error> {
        if text.trim().is_empty() {
            return Ok(Settings::default());
        }
        serde_yaml_ng::from_str(text)
    }

    #[must_use]
    pub fn lossless_baseline(&self) -> LosslessBaseline {
        let defaults = LosslessBaseline::default();
        let settings = self.lossless.clone();
        LosslessBaseline {
            trust: settings.trust.unwrap_or(defaults.trust),
            pfc: settings.pfc.unwrap_or(defaults.pfc),
            traffic_class: settings.traffic_class.unwrap_or(defaults.traffic_class),
            tcp_ecn: settings.tcp_ecn.unwrap_or(defaults.tcp_ecn),
            rdma_cm_tos: settings.rdma_cm_tos.unwrap_or(defaults.rdma_cm_tos),
        }
    }

    #[must_use]
    pub fn temperature_thresholds(&self) -> TemperatureThresholds {
        let defaults = TemperatureThresholds::default();
        TemperatureThresholds {
            warning: self.temperature.warning.unwrap_or(defaults.warning),
            error: self.temperature.error.unwrap_or(defaults.error),
        }
    }
}
