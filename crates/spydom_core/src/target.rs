use std::collections::HashSet;
use std::fmt;

use thiserror::Error;

use crate::naming::output_dir_name;

const DEFAULT_SCHEME: &str = "https";
const SCHEME_SEPARATOR: &str = "://";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TargetError {
    #[error("empty target")]
    Empty,
    #[error("unsupported scheme `{0}` (only http and https are loaded)")]
    UnsupportedScheme(String),
    #[error("invalid url `{input}`: {reason}")]
    InvalidUrl { input: String, reason: String },
}

/// A normalized address to load. Its identity is the normalized string itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Target(String);

impl Target {
    /// Normalize one input line: trim, default the scheme to `https://`, lower-case the
    /// scheme and host. Path, query and fragment keep their case.
    pub fn parse(raw: &str) -> Result<Self, TargetError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(TargetError::Empty);
        }

        let (scheme, rest) = match trimmed.split_once(SCHEME_SEPARATOR) {
            Some((scheme, rest)) if looks_like_scheme(scheme) => {
                let scheme = scheme.to_ascii_lowercase();
                if scheme != "http" && scheme != "https" {
                    return Err(TargetError::UnsupportedScheme(scheme));
                }
                (scheme, rest)
            }
            _ => (DEFAULT_SCHEME.to_string(), trimmed),
        };
        let normalized = format!("{scheme}{SCHEME_SEPARATOR}{}", fold_host(rest));

        url::Url::parse(&normalized).map_err(|err| TargetError::InvalidUrl {
            input: trimmed.to_string(),
            reason: err.to_string(),
        })?;

        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Relative output directory for this identity.
    pub fn output_dir_name(&self) -> String {
        output_dir_name(&self.0)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Target {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Lower-case the host of the part after `scheme://`, leaving userinfo and path alone.
fn fold_host(rest: &str) -> String {
    let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let (authority, tail) = rest.split_at(end);
    let host_start = authority.rfind('@').map_or(0, |at| at + 1);
    let (userinfo, host) = authority.split_at(host_start);
    format!("{userinfo}{}{tail}", host.to_ascii_lowercase())
}

fn looks_like_scheme(candidate: &str) -> bool {
    let mut chars = candidate.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Result of reading a newline-delimited target list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetList {
    /// Unique targets in input order.
    pub targets: Vec<Target>,
    /// `(line number, error)` for lines that could not be normalized.
    pub rejected: Vec<(usize, TargetError)>,
    /// Targets that appeared more than once; only the first occurrence is kept.
    pub duplicates: Vec<Target>,
}

/// Parse a target list. Blank lines and `#` comments are skipped.
pub fn parse_target_list(input: &str) -> TargetList {
    let mut list = TargetList::default();
    let mut seen = HashSet::new();

    for (index, line) in input.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match Target::parse(line) {
            Ok(target) => {
                if seen.insert(target.clone()) {
                    list.targets.push(target);
                } else {
                    list.duplicates.push(target);
                }
            }
            Err(err) => list.rejected.push((index + 1, err)),
        }
    }

    list
}
