//! PythonLibs-style wheel index
//!
//! The index is a JSON object mapping a module name to the prebuilt wheels
//! published for it:
//!
//! ```json
//! { "numpy": [ { "version": "1.11.1", "compatibility_tag": "cp35-cp35m",
//!                "architecture": "win_amd64", "url": "...", ... } ] }
//! ```

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result, ResultExt};

/// One downloadable wheel
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct WheelDist {
    pub version: String,
    /// Python/ABI tag, e.g. `cp35-cp35m`
    #[serde(default)]
    pub compatibility_tag: String,
    /// Platform tag, e.g. `win_amd64` or `win32`
    #[serde(default)]
    pub architecture: String,
    #[serde(default)]
    pub package_size: String,
    pub url: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub home_page: String,
    #[serde(default)]
    pub last_updated: String,
}

/// A module paired with its newest distribution, as shown in search results
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WheelRow<'a> {
    pub module: &'a str,
    pub latest: &'a WheelDist,
}

/// Parsed wheel index
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct WheelIndex {
    modules: BTreeMap<String, Vec<WheelDist>>,
}

impl WheelIndex {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load an index file from disk
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::WheelIndexNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path).context("Failed to read wheel index")?;
        let index = Self::from_json(&content).map_err(|e| {
            Error::wheel_index(format!("failed to parse {}: {}", path.display(), e))
        })?;
        tracing::debug!(
            "Loaded wheel index with {} modules from {:?}",
            index.len(),
            path
        );
        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Modules whose name contains `term` (case-insensitive), sorted by name
    pub fn search(&self, term: &str) -> Vec<WheelRow<'_>> {
        let needle = term.trim().to_lowercase();
        self.modules
            .iter()
            .filter(|(name, _)| name.to_lowercase().contains(&needle))
            .filter_map(|(name, dists)| {
                newest(dists).map(|latest| WheelRow {
                    module: name.as_str(),
                    latest,
                })
            })
            .collect()
    }

    /// All distributions published for a module
    pub fn distributions(&self, module: &str) -> &[WheelDist] {
        self.lookup(module).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Distributions usable by the given interpreter tag and architecture,
    /// newest first
    pub fn compatible(
        &self,
        module: &str,
        python_tag: &str,
        architecture: &str,
    ) -> Vec<&WheelDist> {
        let mut dists: Vec<&WheelDist> = self
            .distributions(module)
            .iter()
            .filter(|d| d.architecture == architecture)
            .filter(|d| python_tag.is_empty() || tag_matches(&d.compatibility_tag, python_tag))
            .collect();
        dists.sort_by(|a, b| compare_versions(&b.version, &a.version));
        dists
    }

    fn lookup(&self, module: &str) -> Option<&Vec<WheelDist>> {
        self.modules.get(module).or_else(|| {
            self.modules
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(module))
                .map(|(_, dists)| dists)
        })
    }
}

/// Architecture tag of wheels matching the running interpreter's bitness
pub fn host_architecture() -> &'static str {
    if cfg!(target_pointer_width = "64") {
        "win_amd64"
    } else {
        "win32"
    }
}

/// `cp35` matches `cp35-cp35m`, `cp35-none`; `py3` matches `py2.py3-none`
fn tag_matches(compatibility_tag: &str, python_tag: &str) -> bool {
    compatibility_tag
        .split(['-', '.'])
        .any(|part| part.eq_ignore_ascii_case(python_tag))
}

fn newest(dists: &[WheelDist]) -> Option<&WheelDist> {
    dists
        .iter()
        .max_by(|a, b| compare_versions(&a.version, &b.version))
}

/// Compare dotted versions numerically where possible, falling back to text
fn compare_versions(a: &str, b: &str) -> Ordering {
    let mut left = a.split('.');
    let mut right = b.split('.');
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (Some(_), None) => return Ordering::Greater,
            (None, Some(_)) => return Ordering::Less,
            (Some(l), Some(r)) => {
                let ord = match (l.parse::<u64>(), r.parse::<u64>()) {
                    (Ok(l), Ok(r)) => l.cmp(&r),
                    _ => l.cmp(r),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}
