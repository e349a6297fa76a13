//! Fixture loading and management.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::HarnessError;

/// A single fixture test case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureCase {
    /// Case identifier.
    pub name: String,
    /// `format_write`, `format_read`, or `lifecycle`.
    pub operation: String,
    /// Behavior the case pins down.
    pub section: String,
    /// Operation inputs (shape depends on `operation`).
    pub inputs: serde_json::Value,
    /// Expected rendered output.
    pub expected_output: String,
    /// IOSTAT the case must finish with.
    #[serde(default)]
    pub expected_iostat: i32,
}

/// A collection of fixture cases for one area of the runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureSet {
    /// Schema version.
    pub version: String,
    /// Area covered, e.g. `format/list-directed`.
    pub family: String,
    /// UTC timestamp of capture.
    pub captured_at: String,
    /// Individual test cases.
    pub cases: Vec<FixtureCase>,
}

impl FixtureSet {
    /// Load fixture set from JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize fixture set to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Load fixture set from a file path.
    pub fn from_file(path: &Path) -> Result<Self, HarnessError> {
        let load = || -> Result<Self, HarnessError> {
            let content = std::fs::read_to_string(path)?;
            Ok(Self::from_json(&content)?)
        };
        load().map_err(|source| HarnessError::Load {
            path: path.to_path_buf(),
            source: Box::new(source),
        })
    }

    /// Load every `*.json` set in a directory, in file-name order.
    pub fn load_dir(dir: &Path) -> Result<Vec<Self>, HarnessError> {
        let mut paths: Vec<_> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|entry| entry.path()))
            .filter(|path| path.extension().and_then(|s| s.to_str()) == Some("json"))
            .collect();
        paths.sort();
        paths.iter().map(|p| Self::from_file(p)).collect()
    }
}
