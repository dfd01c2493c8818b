//! Scraping pip's human-readable output into rows
//!
//! pip's text output is not a stable interface, so every parser works line
//! by line and records lines it cannot understand in
//! [`ParseReport::rejected`] instead of giving up on the whole batch.

use std::sync::LazyLock;

use regex::Regex;

use pipdeck_core::{
    InstalledPackage, OutdatedPackage, PackageDetails, ParseReport, SearchHit,
};

/// `name (version)  - summary`
static SEARCH_HIT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\S+)\s+\(([^)]*)\)\s*(?:-\s*(.*))?$").expect("Invalid search hit regex")
});

/// `  INSTALLED: 1.0 (latest)` or `  INSTALLED: 1.0`
static INSTALLED_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*INSTALLED:\s*(\S+)").expect("Invalid installed regex")
});

/// Legacy `pip list`: `name (version)` or `name (version, /editable/location)`
static LEGACY_LIST_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\S+)\s+\(([^,)]+)(?:,[^)]*)?\)\s*$").expect("Invalid legacy list regex")
});

/// Legacy `pip list --outdated`: `name (version) - Latest: x.y [wheel]`
static LEGACY_OUTDATED_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\S+)\s+\(([^,)]+)(?:,[^)]*)?\)\s+-\s+Latest:\s+(\S+)")
        .expect("Invalid legacy outdated regex")
});

/// `----------  -------` separator under a columns header
static RULE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-+(\s+-+)*\s*$").expect("Invalid rule regex"));

fn is_columns_header(line: &str) -> bool {
    let mut words = line.split_whitespace();
    words.next() == Some("Package") && words.next() == Some("Version")
}

/// Parse `pip search` output.
///
/// Indented lines continue the previous hit's summary, except for the
/// `INSTALLED:` / `LATEST:` markers pip prints under installed packages.
pub fn parse_search_output(output: &str) -> ParseReport<SearchHit> {
    let mut report: ParseReport<SearchHit> = ParseReport::new();

    for (index, raw) in output.lines().enumerate() {
        let line_number = index + 1;
        let line = raw.trim_end();
        if line.trim().is_empty() {
            continue;
        }
        let indented = line.starts_with(char::is_whitespace);

        if let Some(caps) = INSTALLED_REGEX.captures(line) {
            match report.rows.last_mut() {
                Some(hit) => hit.installed = Some(caps[1].to_string()),
                None => report.reject(line_number, line, "INSTALLED marker without a package"),
            }
            continue;
        }

        if indented && line.trim_start().starts_with("LATEST:") {
            if report.rows.is_empty() {
                report.reject(line_number, line, "LATEST marker without a package");
            }
            continue;
        }

        if !indented {
            if let Some(caps) = SEARCH_HIT_REGEX.captures(line) {
                report.push(SearchHit {
                    name: caps[1].to_string(),
                    installed: None,
                    latest: caps[2].trim().to_string(),
                    summary: caps
                        .get(3)
                        .map(|m| m.as_str().trim().to_string())
                        .unwrap_or_default(),
                });
                continue;
            }
        }

        if indented {
            if let Some(hit) = report.rows.last_mut() {
                let extra = line.trim();
                if hit.summary.is_empty() {
                    hit.summary = extra.to_string();
                } else {
                    hit.summary = format!("{} {}", hit.summary, extra);
                }
                continue;
            }
        }
        report.reject(line_number, line, "not a search result");
    }

    report
}

/// Parse `pip list` output, legacy or columns format.
pub fn parse_list_output(output: &str) -> ParseReport<InstalledPackage> {
    let mut report: ParseReport<InstalledPackage> = ParseReport::new();
    let mut columns = false;

    for (index, raw) in output.lines().enumerate() {
        let line_number = index + 1;
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        if is_columns_header(line) {
            columns = true;
            continue;
        }
        if RULE_REGEX.is_match(line) {
            continue;
        }

        if let Some(caps) = LEGACY_LIST_REGEX.captures(line) {
            report.push(InstalledPackage {
                name: caps[1].to_string(),
                version: caps[2].trim().to_string(),
            });
            continue;
        }

        let words: Vec<&str> = line.split_whitespace().collect();
        if columns && words.len() >= 2 {
            report.push(InstalledPackage {
                name: words[0].to_string(),
                version: words[1].to_string(),
            });
        } else {
            report.reject(line_number, line, "expected package name and version");
        }
    }

    report
}

/// Parse `pip list --outdated` output, legacy or columns format.
pub fn parse_outdated_output(output: &str) -> ParseReport<OutdatedPackage> {
    let mut report: ParseReport<OutdatedPackage> = ParseReport::new();
    let mut columns = false;

    for (index, raw) in output.lines().enumerate() {
        let line_number = index + 1;
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        if is_columns_header(line) {
            columns = true;
            continue;
        }
        if RULE_REGEX.is_match(line) {
            continue;
        }

        if let Some(caps) = LEGACY_OUTDATED_REGEX.captures(line) {
            report.push(OutdatedPackage {
                name: caps[1].to_string(),
                version: caps[2].trim().to_string(),
                latest: caps[3].to_string(),
            });
            continue;
        }

        let words: Vec<&str> = line.split_whitespace().collect();
        if columns && words.len() >= 3 {
            report.push(OutdatedPackage {
                name: words[0].to_string(),
                version: words[1].to_string(),
                latest: words[2].to_string(),
            });
        } else {
            report.reject(line_number, line, "expected name, version and latest version");
        }
    }

    report
}

/// Parse `pip show` output. Each `---`-separated block becomes one row.
pub fn parse_show_output(output: &str) -> ParseReport<PackageDetails> {
    let mut report: ParseReport<PackageDetails> = ParseReport::new();
    let mut current = PackageDetails::default();

    for (index, raw) in output.lines().enumerate() {
        let line_number = index + 1;
        let line = raw.trim_end();
        if line.trim() == "---" {
            if !current.is_empty() {
                report.push(std::mem::take(&mut current));
            }
            continue;
        }
        if line.trim().is_empty() {
            continue;
        }

        if line.starts_with(char::is_whitespace) {
            match current.fields.last_mut() {
                Some((_, value)) => {
                    if !value.is_empty() {
                        value.push('\n');
                    }
                    value.push_str(line.trim());
                }
                None => report.reject(line_number, line, "continuation without a field"),
            }
            continue;
        }

        match line.split_once(':') {
            Some((key, value)) if !key.trim().is_empty() && !key.contains(' ') => {
                current
                    .fields
                    .push((key.trim().to_string(), value.trim().to_string()));
            }
            _ => report.reject(line_number, line, "expected `Key: value`"),
        }
    }

    if !current.is_empty() {
        report.push(current);
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_search_output() {
        let output = "\
requests (2.31.0)                - Python HTTP for Humans.
  INSTALLED: 2.28.1
  LATEST:    2.31.0
requests-oauthlib (1.3.1)        - OAuthlib authentication support for
                                   Requests.
requests-mock (1.11.0)           - Mock out responses from the requests package
";
        let report = parse_search_output(output);
        assert!(report.is_clean(), "rejected: {:?}", report.rejected);
        assert_eq!(report.rows.len(), 3);

        assert_eq!(report.rows[0].name, "requests");
        assert_eq!(report.rows[0].latest, "2.31.0");
        assert_eq!(report.rows[0].installed.as_deref(), Some("2.28.1"));
        assert_eq!(report.rows[0].summary, "Python HTTP for Humans.");

        assert_eq!(report.rows[1].installed, None);
        assert_eq!(
            report.rows[1].summary,
            "OAuthlib authentication support for Requests."
        );
    }

    #[test]
    fn test_parse_search_legacy_installed_marker() {
        let output = "six (1.16.0)  - Python 2 and 3 compatibility utilities\n  INSTALLED: 1.16.0 (latest)\n";
        let report = parse_search_output(output);
        assert_eq!(report.rows[0].installed.as_deref(), Some("1.16.0"));
    }

    #[test]
    fn test_parse_search_isolates_bad_lines() {
        let output = "\
ERROR: XMLRPC request failed
six (1.16.0)  - Python 2 and 3 compatibility utilities
";
        let report = parse_search_output(output);
        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.rejected[0].line_number, 1);
    }

    #[test]
    fn test_parse_search_empty_summary() {
        let report = parse_search_output("nosummary (0.1)\n");
        assert_eq!(report.rows[0].summary, "");
        assert_eq!(report.rows[0].latest, "0.1");
    }

    #[test]
    fn test_parse_list_columns_format() {
        let output = "\
Package    Version
---------- -------
pip        23.2.1
setuptools 68.0.0
mylib      0.1.0   /home/me/src/mylib
";
        let report = parse_list_output(output);
        assert!(report.is_clean());
        assert_eq!(
            report.rows,
            vec![
                InstalledPackage {
                    name: "pip".into(),
                    version: "23.2.1".into()
                },
                InstalledPackage {
                    name: "setuptools".into(),
                    version: "68.0.0".into()
                },
                InstalledPackage {
                    name: "mylib".into(),
                    version: "0.1.0".into()
                },
            ]
        );
    }

    #[test]
    fn test_parse_list_legacy_format() {
        let output = "pip (8.1.2)\nsix (1.10.0)\nmylib (0.1, /src/mylib)\n";
        let report = parse_list_output(output);
        assert!(report.is_clean());
        assert_eq!(report.rows.len(), 3);
        assert_eq!(report.rows[2].version, "0.1");
    }

    #[test]
    fn test_parse_list_rejects_noise_without_header() {
        let output = "pip (8.1.2)\nYou are using pip version 8.1.2\n";
        let report = parse_list_output(output);
        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.rejected[0].line_number, 2);
    }

    #[test]
    fn test_parse_outdated_legacy_format() {
        let output = "\
requests (2.28.0) - Latest: 2.31.0 [wheel]
six (1.10.0) - Latest: 1.16.0 [sdist]
";
        let report = parse_outdated_output(output);
        assert!(report.is_clean());
        assert_eq!(
            report.rows[0],
            OutdatedPackage {
                name: "requests".into(),
                version: "2.28.0".into(),
                latest: "2.31.0".into()
            }
        );
        assert_eq!(report.rows[1].latest, "1.16.0");
    }

    #[test]
    fn test_parse_outdated_columns_format() {
        let output = "\
Package    Version Latest Type
---------- ------- ------ -----
setuptools 68.0.0  69.0.2 wheel
";
        let report = parse_outdated_output(output);
        assert!(report.is_clean());
        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.rows[0].latest, "69.0.2");
    }

    #[test]
    fn test_parse_outdated_short_row_rejected() {
        let output = "Package Version Latest Type\nbroken 1.0\n";
        let report = parse_outdated_output(output);
        assert!(report.rows.is_empty());
        assert_eq!(report.rejected.len(), 1);
    }

    #[test]
    fn test_parse_show_output() {
        let output = "\
Name: six
Version: 1.16.0
Summary: Python 2 and 3 compatibility utilities
License: MIT
  with extra text
Requires:
Required-by: python-dateutil
";
        let report = parse_show_output(output);
        assert!(report.is_clean());
        assert_eq!(report.rows.len(), 1);
        let details = &report.rows[0];
        assert_eq!(details.name(), Some("six"));
        assert_eq!(details.version(), Some("1.16.0"));
        assert_eq!(details.get("License"), Some("MIT\nwith extra text"));
        assert_eq!(details.get("Requires"), Some(""));
    }

    #[test]
    fn test_parse_show_multiple_packages() {
        let output = "Name: six\nVersion: 1.16.0\n---\nName: pip\nVersion: 23.2.1\n";
        let report = parse_show_output(output);
        assert_eq!(report.rows.len(), 2);
        assert_eq!(report.rows[1].name(), Some("pip"));
    }

    #[test]
    fn test_parse_show_rejects_free_text() {
        let output = "no package metadata here\n";
        let report = parse_show_output(output);
        assert!(report.rows.is_empty());
        assert_eq!(report.rejected.len(), 1);
    }
}
