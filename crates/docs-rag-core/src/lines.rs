//! Line splitting and integer id allocation.
//!
//! Both helpers are pure so the reconciler and its tests can exercise them
//! without a store.

use anyhow::{anyhow, bail, Result};

/// A trimmed, non-empty line with its 1-based position among kept lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeptLine {
    pub line_number: i64,
    pub text: String,
}

/// Split `content` into trimmed lines, dropping blank ones.
///
/// Line numbers are assigned over the kept lines only, so
/// `"a\n\nb"` yields `(1, "a")` and `(2, "b")`.
pub fn kept_lines(content: &str) -> Vec<KeptLine> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .enumerate()
        .map(|(i, text)| KeptLine {
            line_number: i as i64 + 1,
            text: text.to_string(),
        })
        .collect()
}

/// Parse a stored id as an integer.
pub fn parse_id(id: &str) -> Result<u64> {
    id.parse::<u64>()
        .map_err(|_| anyhow!("stored id '{}' is not a non-negative integer", id))
}

/// Largest id in `ids`, compared numerically. `None` when `ids` is empty.
pub fn max_id<'a, I>(ids: I) -> Result<Option<u64>>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut max: Option<u64> = None;
    for id in ids {
        let value = parse_id(id)?;
        max = Some(max.map_or(value, |m| m.max(value)));
    }
    Ok(max)
}

/// Allocate `count` new ids following the current maximum.
///
/// The result is the contiguous range `max + 1 ..= max + count`, or
/// `0 .. count` when `existing` is empty.
pub fn next_ids(existing: &[String], count: usize) -> Result<Vec<String>> {
    let start = match max_id(existing)? {
        Some(max) => match max.checked_add(1) {
            Some(start) => start,
            None => bail!("id space exhausted: stored id {} is the largest possible", max),
        },
        None => 0,
    };
    let Some(end) = start.checked_add(count as u64) else {
        bail!("id space exhausted: cannot allocate {} ids after {}", count, start);
    };
    Ok((start..end).map(|i| i.to_string()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_kept_lines_drop_blank_and_renumber() {
        let lines = kept_lines("a\n\nb\nc\nd\n");
        let got: Vec<(i64, &str)> = lines
            .iter()
            .map(|l| (l.line_number, l.text.as_str()))
            .collect();
        assert_eq!(got, vec![(1, "a"), (2, "b"), (3, "c"), (4, "d")]);
    }

    #[test]
    fn test_kept_lines_trims_whitespace_only() {
        let lines = kept_lines("   \n\t\n  hello  \r\n \n world\t");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text, "hello");
        assert_eq!(lines[1].text, "world");
        assert_eq!(lines[1].line_number, 2);
    }

    #[test]
    fn test_kept_lines_empty_input() {
        assert!(kept_lines("").is_empty());
        assert!(kept_lines("\n\n   \n").is_empty());
    }

    #[test]
    fn test_next_ids_empty_store_starts_at_zero() {
        assert_eq!(next_ids(&[], 3).unwrap(), ids(&["0", "1", "2"]));
    }

    #[test]
    fn test_next_ids_follow_numeric_max() {
        // "9" > "10" lexicographically; allocation must use the integer value.
        let existing = ids(&["9", "10", "2"]);
        assert_eq!(next_ids(&existing, 2).unwrap(), ids(&["11", "12"]));
    }

    #[test]
    fn test_next_ids_with_gaps() {
        let existing = ids(&["0", "5", "3"]);
        assert_eq!(next_ids(&existing, 1).unwrap(), ids(&["6"]));
    }

    #[test]
    fn test_next_ids_zero_count() {
        assert!(next_ids(&ids(&["4"]), 0).unwrap().is_empty());
    }

    #[test]
    fn test_non_integer_id_is_an_error() {
        let err = next_ids(&ids(&["1", "abc"]), 1).unwrap_err();
        assert!(err.to_string().contains("abc"));
    }

    #[test]
    fn test_largest_id_cannot_be_followed() {
        let err = next_ids(&[u64::MAX.to_string()], 1).unwrap_err();
        assert!(err.to_string().contains("id space exhausted"));
    }

    #[test]
    fn test_range_past_largest_id_is_an_error() {
        let near_end = (u64::MAX - 5).to_string();
        assert!(next_ids(&[near_end.clone()], 3).is_ok());
        assert!(next_ids(&[near_end], 10).is_err());
    }
}
