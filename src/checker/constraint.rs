//! Version constraint parsing on top of the `semver` crate.
//!
//! Manifests use composer-style expressions: alternatives joined by `||`,
//! comparators joined by whitespace or commas, hyphen ranges and bare exact
//! versions. These are normalized into one [`VersionReq`] per alternative.
//! Caret and tilde keep `semver` semantics.

use semver::{Version, VersionReq};
use std::fmt;
use std::str::FromStr;

use crate::error::ConstraintError;

const OPERATOR_CHARS: &[char] = &['<', '>', '=', '^', '~'];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionConstraint {
    raw: String,
    alternatives: Vec<VersionReq>,
}

impl VersionConstraint {
    pub fn parse(input: &str) -> Result<Self, ConstraintError> {
        let raw = input.trim();
        if raw.is_empty() {
            return Err(ConstraintError::Empty);
        }

        let alternatives = raw
            .split("||")
            .flat_map(|part| part.split('|'))
            .map(|alt| parse_alternative(raw, alt))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            raw: raw.to_string(),
            alternatives,
        })
    }

    pub fn matches(&self, version: &Version) -> bool {
        self.alternatives.iter().any(|req| req.matches(version))
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl FromStr for VersionConstraint {
    type Err = ConstraintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn invalid(constraint: &str, reason: impl Into<String>) -> ConstraintError {
    ConstraintError::Invalid {
        constraint: constraint.to_string(),
        reason: reason.into(),
    }
}

fn parse_alternative(raw: &str, alternative: &str) -> Result<VersionReq, ConstraintError> {
    let alternative = alternative.trim();
    if alternative.is_empty() {
        return Err(invalid(raw, "empty alternative"));
    }

    let comparators = if let Some((low, high)) = alternative.split_once(" - ") {
        vec![
            format!(">={}", strip_prefix_v(low.trim())),
            format!("<={}", strip_prefix_v(high.trim())),
        ]
    } else {
        let mut comparators = Vec::new();
        for token in tokenize(alternative) {
            if let Some(comparator) = normalize_token(raw, &token)? {
                comparators.push(comparator);
            }
        }
        comparators
    };

    if comparators.is_empty() {
        return Err(invalid(raw, "no version comparators"));
    }

    VersionReq::parse(&comparators.join(", ")).map_err(|e| invalid(raw, e.to_string()))
}

/// Splits on whitespace and commas, gluing a dangling operator to the
/// version that follows it (`>= 1.0` becomes `>=1.0`).
fn tokenize(alternative: &str) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    let mut pending_op: Option<String> = None;

    for piece in alternative
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|p| !p.is_empty())
    {
        if piece.chars().all(|c| OPERATOR_CHARS.contains(&c) || c == '!') {
            pending_op = Some(pending_op.unwrap_or_default() + piece);
            continue;
        }
        match pending_op.take() {
            Some(op) => tokens.push(op + piece),
            None => tokens.push(piece.to_string()),
        }
    }

    if let Some(op) = pending_op {
        tokens.push(op);
    }
    tokens
}

fn normalize_token(raw: &str, token: &str) -> Result<Option<String>, ConstraintError> {
    // Stability flags (`@dev`, `1.0@beta`) carry no version information.
    let token = token.split('@').next().unwrap_or_default();
    if token.is_empty() {
        return Ok(None);
    }

    if token.starts_with("!=") {
        return Err(invalid(raw, "'!=' is not supported"));
    }

    let split = token
        .find(|c: char| !OPERATOR_CHARS.contains(&c))
        .unwrap_or(token.len());
    let (op, version) = token.split_at(split);
    let version = strip_prefix_v(version);

    if version.is_empty() {
        return Err(invalid(raw, format!("operator '{}' without a version", op)));
    }

    if is_wildcard(version) {
        return Ok(Some(if op.is_empty() || op == "=" {
            version.to_string()
        } else {
            format!("{}{}", op, version)
        }));
    }

    let comparator = match op {
        "" | "=" | "==" => format!("={}", pad_exact(version)),
        _ => format!("{}{}", op, version),
    };
    Ok(Some(comparator))
}

fn strip_prefix_v(version: &str) -> &str {
    version
        .strip_prefix('v')
        .or_else(|| version.strip_prefix('V'))
        .unwrap_or(version)
}

fn is_wildcard(version: &str) -> bool {
    version
        .split('.')
        .any(|part| part == "*" || part == "x" || part == "X")
}

/// `1.2` as an exact constraint means `1.2.0`, not "any 1.2.x".
fn pad_exact(version: &str) -> String {
    let (core, rest) = match version.find(['-', '+']) {
        Some(idx) => version.split_at(idx),
        None => (version, ""),
    };
    let parts = core.split('.').count();
    let padding = ".0".repeat(3usize.saturating_sub(parts));
    format!("{}{}{}", core, padding, rest)
}

/// Interprets an installed version string leniently.
///
/// Leading `v` is dropped, missing components are zero-filled and any
/// distribution suffix is ignored (`v8.2.12-1ubuntu` → `8.2.12`).
pub fn coerce_version(input: &str) -> Result<Version, ConstraintError> {
    let trimmed = strip_prefix_v(input.trim());
    let numeric: String = trimmed
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    let parts: Vec<u64> = numeric
        .split('.')
        .filter(|p| !p.is_empty())
        .take(3)
        .map(|p| p.parse::<u64>())
        .collect::<Result<_, _>>()
        .map_err(|_| ConstraintError::InvalidVersion(input.to_string()))?;

    if parts.is_empty() {
        return Err(ConstraintError::InvalidVersion(input.to_string()));
    }

    Ok(Version::new(
        parts[0],
        parts.get(1).copied().unwrap_or(0),
        parts.get(2).copied().unwrap_or(0),
    ))
}
