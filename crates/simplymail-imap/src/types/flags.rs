//! Message flags from `FLAGS` and `PERMANENTFLAGS` data.

/// One system flag or keyword.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Flag {
    /// `\Seen`
    Seen,
    /// `\Answered`
    Answered,
    /// `\Flagged`
    Flagged,
    /// `\Deleted`
    Deleted,
    /// `\Draft`
    Draft,
    /// `\Recent`
    Recent,
    /// `\*`: clients may create new keywords.
    Wildcard,
    /// Any other flag, kept as sent.
    Keyword(String),
}

impl Flag {
    /// Maps a flag atom, ignoring case for the system flags.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        const SYSTEM: [(&str, Flag); 7] = [
            ("\\Seen", Flag::Seen),
            ("\\Answered", Flag::Answered),
            ("\\Flagged", Flag::Flagged),
            ("\\Deleted", Flag::Deleted),
            ("\\Draft", Flag::Draft),
            ("\\Recent", Flag::Recent),
            ("\\*", Flag::Wildcard),
        ];

        SYSTEM
            .into_iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(s))
            .map_or_else(|| Self::Keyword(s.to_string()), |(_, flag)| flag)
    }
}

/// Flags in the order the server listed them, duplicates dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Flags(Vec<Flag>);

impl Flags {
    /// No flags.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `flag` unless already present.
    pub fn insert(&mut self, flag: Flag) {
        if !self.0.contains(&flag) {
            self.0.push(flag);
        }
    }

    /// Whether `flag` is present.
    #[must_use]
    pub fn contains(&self, flag: &Flag) -> bool {
        self.0.contains(flag)
    }

    /// Number of distinct flags.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are none.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates in server order.
    pub fn iter(&self) -> impl Iterator<Item = &Flag> {
        self.0.iter()
    }
}

impl FromIterator<Flag> for Flags {
    fn from_iter<I: IntoIterator<Item = Flag>>(iter: I) -> Self {
        let mut flags = Self::new();
        for flag in iter {
            flags.insert(flag);
        }
        flags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_ignores_case_of_system_flags() {
        assert_eq!(Flag::parse("\\seen"), Flag::Seen);
        assert_eq!(Flag::parse("\\DRAFT"), Flag::Draft);
        assert_eq!(Flag::parse("\\*"), Flag::Wildcard);
        assert_eq!(Flag::parse("$Junk"), Flag::Keyword("$Junk".into()));
    }

    #[test]
    fn collecting_drops_duplicates() {
        let flags: Flags = ["\\Seen", "\\SEEN", "$Label1"].into_iter().map(Flag::parse).collect();
        assert_eq!(flags.len(), 2);
        assert!(flags.contains(&Flag::Seen));
        assert_eq!(flags.iter().last(), Some(&Flag::Keyword("$Label1".into())));
        assert!(Flags::new().is_empty());
    }
}
