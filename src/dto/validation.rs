//! Validation helpers for DTOs.

use std::borrow::Cow;

use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use validator::ValidationError;

/// Highest score accepted for one side of a set.
const MAX_SET_SCORE: u32 = 999;

fn failure(code: &'static str, message: impl Into<Cow<'static, str>>) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

/// Validates a tournament url slug: 1 to 60 characters of `[a-z0-9_]`.
///
/// ```ignore
/// validate_url_slug("friday_weekly") // Ok
/// validate_url_slug("Friday-Weekly") // Err
/// ```
pub fn validate_url_slug(slug: &str) -> Result<(), ValidationError> {
    if slug.is_empty() || slug.len() > 60 {
        return Err(failure(
            "url_length",
            format!("must be 1 to 60 characters (got {})", slug.len()),
        ));
    }

    if !slug
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    {
        return Err(failure(
            "url_format",
            "may only contain lowercase letters, digits and underscores",
        ));
    }

    Ok(())
}

/// Validates a Challonge score string: comma separated `a-b` sets, each side 0 to 999.
pub fn validate_scores_csv(scores: &str) -> Result<(), ValidationError> {
    if scores.trim().is_empty() {
        return Err(failure("scores_empty", "must not be empty"));
    }

    for set in scores.split(',') {
        let parsed = set
            .trim()
            .split_once('-')
            .and_then(|(left, right)| Some((left.parse::<u32>().ok()?, right.parse::<u32>().ok()?)));
        match parsed {
            Some((left, right)) if left <= MAX_SET_SCORE && right <= MAX_SET_SCORE => {}
            Some(_) => {
                return Err(failure(
                    "scores_range",
                    format!("set `{}` is out of range (0-{MAX_SET_SCORE})", set.trim()),
                ));
            }
            None => {
                return Err(failure(
                    "scores_format",
                    format!("set `{}` must look like `2-1`", set.trim()),
                ));
            }
        }
    }

    Ok(())
}

/// Validates an RFC 3339 timestamp.
pub fn validate_timestamp(value: &str) -> Result<(), ValidationError> {
    OffsetDateTime::parse(value, &Rfc3339)
        .map(|_| ())
        .map_err(|_| failure("timestamp", "must be an RFC 3339 timestamp"))
}

/// Report the first value that appears twice in `values`.
pub fn first_duplicate<T: Copy + Eq + std::hash::Hash>(values: impl IntoIterator<Item = T>) -> Option<T> {
    let mut seen = std::collections::HashSet::new();
    values.into_iter().find(|value| !seen.insert(*value))
}

/// Failure for a repeated value in a list field.
pub fn duplicate_error(what: &str, value: impl std::fmt::Display) -> ValidationError {
    failure("duplicate", format!("{what} {value} appears more than once"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugs() {
        assert!(validate_url_slug("friday_weekly_42").is_ok());
        assert!(validate_url_slug("").is_err());
        assert!(validate_url_slug("Friday").is_err());
        assert!(validate_url_slug("friday-weekly").is_err());
        assert!(validate_url_slug(&"a".repeat(61)).is_err());
    }

    #[test]
    fn scores() {
        assert!(validate_scores_csv("2-1").is_ok());
        assert!(validate_scores_csv("3-2,1-3, 3-0").is_ok());
        assert!(validate_scores_csv("").is_err());
        assert!(validate_scores_csv("2:1").is_err());
        assert!(validate_scores_csv("1000-0").is_err());
        assert!(validate_scores_csv("2-1,").is_err());
    }

    #[test]
    fn timestamps() {
        assert!(validate_timestamp("2024-03-02T18:00:00Z").is_ok());
        assert!(validate_timestamp("2024-03-02 18:00").is_err());
    }

    #[test]
    fn duplicates() {
        assert_eq!(first_duplicate([1, 2, 3]), None);
        assert_eq!(first_duplicate([1, 2, 1]), Some(1));
    }
}
