//! Task identifier scheme.
//!
//! Identifiers are dot-delimited codes such as `TASK1`, `TASK1.2` and
//! `TASK1.2.3`. The number of dots is the depth of the task in its tree.

/// Prefix shared by every task identifier.
pub const PREFIX: &str = "TASK";

/// Deepest allowed depth (two dots, three levels).
pub const MAX_DEPTH: usize = 2;

/// Width that numeric runs are zero-padded to in [`sort_key`].
pub const SORT_PAD: usize = 5;

/// Largest number a single identifier segment may carry.
pub const MAX_SEGMENT: u64 = 99_999;

/// Check that an identifier matches `TASK\d+(\.\d+)*` exactly.
pub fn is_valid(id: &str) -> bool {
    match id.strip_prefix(PREFIX) {
        Some(rest) => rest
            .split('.')
            .all(|seg| !seg.is_empty() && seg.bytes().all(|b| b.is_ascii_digit())),
        None => false,
    }
}

/// Depth of an identifier: the number of dots it contains.
pub fn depth(id: &str) -> usize {
    id.bytes().filter(|&b| b == b'.').count()
}

/// Identifier with its last dot-segment removed, or `None` at depth 0.
pub fn parent_of(id: &str) -> Option<&str> {
    id.rsplit_once('.').map(|(parent, _)| parent)
}

/// Numeric components of a valid identifier (`TASK1.10` -> `[1, 10]`).
pub fn segments(id: &str) -> Option<Vec<u64>> {
    if !is_valid(id) {
        return None;
    }
    id[PREFIX.len()..]
        .split('.')
        .map(|seg| seg.parse::<u64>().ok())
        .collect()
}

/// True if every numeric segment fits within [`MAX_SEGMENT`].
pub fn within_limits(id: &str) -> bool {
    segments(id).is_some_and(|segs| segs.iter().all(|&n| n <= MAX_SEGMENT))
}

fn next_number(max: u64) -> Option<u64> {
    max.checked_add(1).filter(|&n| n <= MAX_SEGMENT)
}

/// Next free root identifier: one past the highest depth-0 number in use.
///
/// Identifiers that are not valid, or that are deeper than depth 0, are ignored.
/// Returns `None` once the next number would pass [`MAX_SEGMENT`].
pub fn generate_root_id<'a, I>(existing: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let max = existing
        .into_iter()
        .filter(|id| depth(id) == 0)
        .filter_map(|id| segments(id).and_then(|s| s.first().copied()))
        .max()
        .unwrap_or(0);
    next_number(max).map(|n| format!("{PREFIX}{n}"))
}

/// Next free child identifier directly under `parent`, or `None` once the
/// next number would pass [`MAX_SEGMENT`].
pub fn generate_child_id<'a, I>(existing: I, parent: &str) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let max = existing
        .into_iter()
        .filter_map(|id| id.strip_prefix(parent)?.strip_prefix('.'))
        .filter(|tail| !tail.is_empty() && tail.bytes().all(|b| b.is_ascii_digit()))
        .filter_map(|tail| tail.parse::<u64>().ok())
        .max()
        .unwrap_or(0);
    next_number(max).map(|n| format!("{parent}.{n}"))
}

/// Natural-order sort key.
///
/// Every run of digits is left-padded with zeros to five characters, so that
/// plain string comparison of keys puts `TASK2` before `TASK10` and `TASK1.2`
/// before `TASK1.10`. Numbers above 99999 are not supported: their runs come
/// out longer than five characters and ordering against them is unspecified.
pub fn sort_key(id: &str) -> String {
    let mut out = String::with_capacity(id.len() + 8);
    let mut digits = String::new();
    for ch in id.chars() {
        if ch.is_ascii_digit() {
            digits.push(ch);
            continue;
        }
        flush_digits(&mut out, &mut digits);
        out.push(ch);
    }
    flush_digits(&mut out, &mut digits);
    out
}

fn flush_digits(out: &mut String, digits: &mut String) {
    if digits.is_empty() {
        return;
    }
    for _ in digits.len()..SORT_PAD {
        out.push('0');
    }
    out.push_str(digits);
    digits.clear();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid() {
        assert!(is_valid("TASK1"));
        assert!(is_valid("TASK12.3.40"));
        assert!(is_valid("TASK1.2.3.4"));
        assert!(!is_valid("TASK"));
        assert!(!is_valid("task1"));
        assert!(!is_valid("TASK1."));
        assert!(!is_valid("TASK1..2"));
        assert!(!is_valid("TASK1.a"));
        assert!(!is_valid(" TASK1"));
        assert!(!is_valid("ITEM1"));
    }

    #[test]
    fn test_depth_and_parent() {
        assert_eq!(depth("TASK1"), 0);
        assert_eq!(depth("TASK1.2.3"), 2);
        assert_eq!(parent_of("TASK1"), None);
        assert_eq!(parent_of("TASK1.2"), Some("TASK1"));
        assert_eq!(parent_of("TASK1.2.3"), Some("TASK1.2"));
    }

    #[test]
    fn test_generate_ids() {
        let ids = ["TASK1", "TASK3", "TASK3.1"];
        assert_eq!(generate_root_id(ids).as_deref(), Some("TASK4"));
        assert_eq!(generate_child_id(ids, "TASK3").as_deref(), Some("TASK3.2"));
        assert_eq!(generate_child_id(ids, "TASK1").as_deref(), Some("TASK1.1"));
        assert_eq!(generate_root_id(std::iter::empty()).as_deref(), Some("TASK1"));
    }

    #[test]
    fn test_generate_child_ignores_grandchildren_and_lookalikes() {
        let ids = ["TASK1", "TASK1.2", "TASK1.2.9", "TASK10.7", "TASK1.x"];
        assert_eq!(generate_child_id(ids, "TASK1").as_deref(), Some("TASK1.3"));
        assert_eq!(generate_child_id(ids, "TASK1.2").as_deref(), Some("TASK1.2.10"));
    }

    #[test]
    fn test_generate_root_ignores_junk() {
        let ids = ["TASK2", "TASK9.1", "garbage", "TASKX"];
        assert_eq!(generate_root_id(ids).as_deref(), Some("TASK3"));
    }

    #[test]
    fn test_segment_limit() {
        assert!(within_limits("TASK99999.1"));
        assert!(!within_limits("TASK100000"));
        assert!(!within_limits("TASK1.100000"));
        assert!(!within_limits("TASK18446744073709551616"));

        assert_eq!(generate_root_id(["TASK99998"]).as_deref(), Some("TASK99999"));
        assert_eq!(generate_root_id(["TASK99999"]), None);
        assert_eq!(generate_root_id(["TASK18446744073709551615"]), None);
        assert_eq!(generate_child_id(["TASK1.99999"], "TASK1"), None);
        assert_eq!(generate_child_id(["TASK1.18446744073709551615"], "TASK1"), None);
    }

    #[test]
    fn test_sort_key_natural_order() {
        assert_eq!(sort_key("TASK1.1"), "TASK00001.00001");
        assert!(sort_key("TASK2") < sort_key("TASK10"));
        assert!(sort_key("TASK1.2") < sort_key("TASK1.10"));
        assert!(sort_key("TASK1") < sort_key("TASK1.1"));
        assert!(sort_key("TASK1.9.9") < sort_key("TASK2"));
    }

    #[test]
    fn test_sort_key_matches_tuple_order() {
        let ids = ["TASK3.2", "TASK10.1", "TASK3.10", "TASK99999.1", "TASK3.1", "TASK4.0"];
        for a in ids {
            for b in ids {
                let (sa, sb) = (segments(a).unwrap(), segments(b).unwrap());
                assert_eq!(sort_key(a) < sort_key(b), sa < sb, "{a} vs {b}");
            }
        }
    }
}
