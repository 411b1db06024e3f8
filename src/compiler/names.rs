//! Anonymous and truncated name allocation.
//!
//! Counters live in per-compilation state, so a fresh compiler always
//! produces the same names for the same tree.

use std::collections::HashMap;

/// Per-compilation allocator for anonymous labels and deduplicated bind
/// parameter names.
#[derive(Debug, Default)]
pub struct NameAllocator {
    anon_counter: usize,
    /// Disambiguation counters per contended bind key.
    bind_counters: HashMap<String, usize>,
}

impl NameAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next anonymous name with the given hint, e.g. `anon_1`.
    pub fn next_anon(&mut self, hint: &str) -> String {
        self.anon_counter += 1;
        format!("{}_{}", hint, self.anon_counter)
    }

    /// Next disambiguated name for a contended bind key, e.g. `x_1`.
    pub fn next_bind_suffix(&mut self, key: &str) -> String {
        let counter = self.bind_counters.entry(key.to_string()).or_insert(0);
        *counter += 1;
        format!("{}_{}", key, counter)
    }
}

/// Deterministically shorten `name` to at most `max_len` characters.
///
/// Over-length names keep their first `max_len - 8` characters and gain a
/// `_` plus the last four hex digits of the md5 digest of the full name:
/// same input, same truncation, low collision probability across names.
pub fn truncate_identifier(name: &str, max_len: usize) -> String {
    if name.chars().count() <= max_len {
        return name.to_string();
    }
    let digest = format!("{:x}", md5::compute(name.as_bytes()));
    let tail = &digest[digest.len() - 4..];
    let keep = max_len.saturating_sub(8);
    let head: String = name.chars().take(keep).collect();
    format!("{}_{}", head, tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_names_pass_through() {
        assert_eq!(truncate_identifier("users", 30), "users");
    }

    #[test]
    fn test_truncation_is_deterministic_and_bounded() {
        let name = "a_very_long_identifier_name_that_exceeds_the_limit";
        let a = truncate_identifier(name, 30);
        let b = truncate_identifier(name, 30);
        assert_eq!(a, b);
        assert!(a.len() <= 30);
        assert!(a.starts_with("a_very_long_identifier"));
        assert_eq!(a.chars().nth(22), Some('_'));
    }

    #[test]
    fn test_distinct_names_truncate_differently() {
        let a = truncate_identifier("a_very_long_identifier_name_that_exceeds_one", 20);
        let b = truncate_identifier("a_very_long_identifier_name_that_exceeds_two", 20);
        assert_ne!(a, b);
    }

    #[test]
    fn test_anon_names_increment() {
        let mut names = NameAllocator::new();
        assert_eq!(names.next_anon("anon"), "anon_1");
        assert_eq!(names.next_anon("anon"), "anon_2");
        assert_eq!(names.next_bind_suffix("x"), "x_1");
        assert_eq!(names.next_bind_suffix("x"), "x_2");
        assert_eq!(names.next_bind_suffix("y"), "y_1");
    }
}
