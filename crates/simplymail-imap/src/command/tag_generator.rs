//! Command tags.

/// Hands out `A0000`, `A0001`, ... so each command's completion can be
/// matched by tag. Past `A9999` the number simply grows wider.
#[derive(Debug, Clone, Default)]
pub struct TagGenerator {
    issued: u32,
}

impl TagGenerator {
    /// Returns the next unused tag.
    pub fn next_tag(&mut self) -> String {
        let tag = format!("A{:04}", self.issued);
        self.issued = self.issued.wrapping_add(1);
        tag
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_start_at_zero() {
        let mut tags = TagGenerator::default();
        assert_eq!(tags.next_tag(), "A0000");
        assert_eq!(tags.next_tag(), "A0001");
    }

    #[test]
    fn test_tags_widen_past_four_digits() {
        let mut tags = TagGenerator { issued: 9999 };
        assert_eq!(tags.next_tag(), "A9999");
        assert_eq!(tags.next_tag(), "A10000");
    }

    #[test]
    fn test_tags_unique() {
        let mut tags = TagGenerator::default();
        let seen: std::collections::HashSet<String> = (0..5000).map(|_| tags.next_tag()).collect();
        assert_eq!(seen.len(), 5000);
    }
}
