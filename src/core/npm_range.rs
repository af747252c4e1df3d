//! Matching of npm version ranges.
//!
//! npm ranges are a superset of what the `semver` crate's `VersionReq`
//! accepts. Each `||` alternative is rewritten into a comma-joined
//! `VersionReq` before matching:
//!
//! - space-separated comparators become `,`
//! - `1.2.3 - 2.3` hyphen ranges become `>=1.2.3, <=2.3`
//! - bare versions become exact (`1.2.3` -> `=1.2.3`), so partial versions
//!   and x-ranges (`16`, `16.x`, `1.2.*`) cover their whole span
//! - a leading `v` and operators detached by a space (`>= 1.2`) are accepted
//!
//! Caret and tilde on `0.x` versions and on partial versions follow the
//! `semver` crate, which agrees with npm for them.

use semver::{Version, VersionReq};

/// Extract a concrete version from a range or version string.
///
/// Leading operators are dropped and the first dotted number is padded to
/// `major.minor.patch`; `"^18"` becomes `18.0.0`, `">=1.2"` becomes `1.2.0`.
/// Returns `None` when no version can be found (`"latest"`, git URLs).
pub fn extract_version(raw: &str) -> Option<Version> {
    let trimmed = raw
        .trim()
        .trim_start_matches(|c| matches!(c, '~' | '^' | '>' | '=' | '<'));

    let start = trimmed.find(|c: char| c.is_ascii_digit())?;
    let rest = &trimmed[start..];
    let end = rest
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(rest.len());

    let mut parts: Vec<u64> = Vec::with_capacity(3);
    for part in rest[..end].split('.').take(3) {
        if part.is_empty() {
            break;
        }
        parts.push(part.parse().ok()?);
    }
    parts.resize(3, 0);

    Some(Version::new(parts[0], parts[1], parts[2]))
}

/// The operator prefix of a range: `"^"` for `^1.2.3`, `""` for `1.2.3`.
///
/// Everything up to the first digit or space counts as prefix, so
/// `workspace:^` style ranges keep their whole prefix.
pub fn range_prefix(range: &str) -> &str {
    let end = range
        .find(|c: char| c.is_ascii_digit() || c == ' ')
        .unwrap_or(range.len());
    &range[..end]
}

/// Check whether `version` lies in the npm range `range`.
///
/// An alternative that is not a valid npm range (`latest`, `^next`, git
/// URLs) never matches.
pub fn satisfies(version: &Version, range: &str) -> bool {
    range
        .split("||")
        .filter_map(to_version_req)
        .any(|req| req.matches(version))
}

/// Translate one `||` alternative into a `VersionReq`.
fn to_version_req(alternative: &str) -> Option<VersionReq> {
    let comparators = comparators(alternative)?;
    if comparators.is_empty() {
        return Some(VersionReq::STAR);
    }
    VersionReq::parse(&comparators.join(", ")).ok()
}

fn comparators(alternative: &str) -> Option<Vec<String>> {
    let mut tokens: Vec<String> = Vec::new();
    let mut operator = String::new();
    for token in alternative.split_whitespace() {
        if token.chars().all(is_operator) {
            operator.push_str(token);
        } else {
            tokens.push(format!("{}{}", std::mem::take(&mut operator), token));
        }
    }
    if !operator.is_empty() {
        return None;
    }

    let mut comparators = Vec::with_capacity(tokens.len());
    let mut i = 0;
    while i < tokens.len() {
        if tokens.get(i + 1).is_some_and(|t| t == "-") {
            let upper = tokens.get(i + 2)?;
            comparators.extend(comparator(">=", partial(&tokens[i])));
            comparators.extend(comparator("<=", partial(upper)));
            i += 3;
            continue;
        }

        let (op, version) = split_operator(&tokens[i]);
        let op = if op.is_empty() { "=" } else { op };
        comparators.extend(comparator(op, partial(version)));
        i += 1;
    }
    Some(comparators)
}

fn is_operator(c: char) -> bool {
    matches!(c, '<' | '>' | '=' | '~' | '^')
}

fn split_operator(token: &str) -> (&str, &str) {
    let end = token.find(|c| !is_operator(c)).unwrap_or(token.len());
    token.split_at(end)
}

/// Drop a leading `v` and cut the version at its first wildcard part.
///
/// `1.2.x` becomes `1.2`, `*` becomes the empty string.
fn partial(version: &str) -> String {
    let version = version.strip_prefix('v').unwrap_or(version);
    version
        .splitn(3, '.')
        .take_while(|part| !matches!(*part, "x" | "X" | "*"))
        .collect::<Vec<_>>()
        .join(".")
}

/// A wildcard version admits everything and yields no comparator.
fn comparator(op: &str, version: String) -> Option<String> {
    if version.is_empty() {
        None
    } else {
        Some(format!("{}{}", op, version))
    }
}
