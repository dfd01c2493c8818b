//! Package rows scraped from pip's text output

use serde::{Deserialize, Serialize};

/// A single PyPI search result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub name: String,
    /// Installed version, if the package is present locally
    pub installed: Option<String>,
    pub latest: String,
    pub summary: String,
}

impl SearchHit {
    /// Installed version or the "Not installed" placeholder used in listings
    pub fn installed_display(&self) -> &str {
        self.installed.as_deref().unwrap_or("Not installed")
    }
}

/// A package reported by `pip list`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledPackage {
    pub name: String,
    pub version: String,
}

/// A package reported by `pip list --outdated`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutdatedPackage {
    pub name: String,
    pub version: String,
    pub latest: String,
}

/// Fields reported by `pip show`, in output order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageDetails {
    pub fields: Vec<(String, String)>,
}

impl PackageDetails {
    /// Look up a field by key (case-insensitive)
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    pub fn name(&self) -> Option<&str> {
        self.get("Name")
    }

    pub fn version(&self) -> Option<&str> {
        self.get("Version")
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A line that could not be turned into a row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedLine {
    /// 1-based line number in the parsed text
    pub line_number: usize,
    pub line: String,
    pub reason: String,
}

/// Outcome of parsing a block of pip output
///
/// Malformed lines are collected in `rejected` instead of failing the batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseReport<T> {
    pub rows: Vec<T>,
    pub rejected: Vec<RejectedLine>,
}

impl<T> Default for ParseReport<T> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            rejected: Vec::new(),
        }
    }
}

impl<T> ParseReport<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, row: T) {
        self.rows.push(row);
    }

    pub fn reject(&mut self, line_number: usize, line: &str, reason: impl Into<String>) {
        self.rejected.push(RejectedLine {
            line_number,
            line: line.to_string(),
            reason: reason.into(),
        });
    }

    /// True when every non-blank line produced a row
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}
