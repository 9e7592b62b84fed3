//! Scanning engine output for failure codes.

use crate::error::{CoordError, Result};
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

static ERROR_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(RMAN|ORA)-[0-9]{5}\b").expect("constant regex pattern is valid"));

static IGNORE_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(RMAN|ORA)-[0-9]{5}$").expect("constant regex pattern is valid"));

static CREDENTIALS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\w+)/[^@\s]+").expect("constant regex pattern is valid"));

/// Finds `RMAN-NNNNN` and `ORA-NNNNN` codes that are not ignored.
#[derive(Debug, Clone, Default)]
pub struct ErrorScanner {
    ignored: BTreeSet<String>,
}

impl ErrorScanner {
    /// Build a scanner ignoring `codes`; every code must look like
    /// `RMAN-03009` or `ORA-19511`.
    pub fn new<S: AsRef<str>>(codes: &[S]) -> Result<Self> {
        let mut ignored = BTreeSet::new();
        for code in codes {
            let code = code.as_ref().trim();
            if !is_valid_code(code) {
                return Err(CoordError::UserError(format!(
                    "invalid failure code '{}' - must be ORA-99999 or RMAN-99999 type codes",
                    code
                )));
            }
            ignored.insert(code.to_string());
        }
        Ok(Self { ignored })
    }

    /// Every failure code in `lines` that is not ignored, in order of
    /// first appearance.
    pub fn failures<S: AsRef<str>>(&self, lines: &[S]) -> Vec<String> {
        let mut found: Vec<String> = Vec::new();
        for line in lines {
            for code in ERROR_CODE.find_iter(line.as_ref()) {
                let code = code.as_str();
                if !self.ignored.contains(code) && !found.iter().any(|c| c == code) {
                    found.push(code.to_string());
                }
            }
        }
        found
    }
}

/// Whether `code` is a well-formed failure code.
pub fn is_valid_code(code: &str) -> bool {
    IGNORE_CODE.is_match(code)
}

/// Replace the password in `user/password@service` strings.
pub(super) fn mask_credentials(line: &str) -> String {
    CREDENTIALS.replace_all(line, "$1/*****").into_owned()
}
