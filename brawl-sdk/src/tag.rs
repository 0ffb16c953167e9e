use std::fmt::Display;
use std::str::FromStr;

/// Every character a player or club tag may contain.
pub const TAG_ALPHABET: &str = "0289PYLQGRJCUV";
pub const MIN_TAG_LEN: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagError {
    TooShort(String),
    InvalidCharacters { tag: String, invalid: Vec<char> },
}

impl Display for TagError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TagError::TooShort(tag) => write!(
                f,
                "Tag \"{}\" is shorter than {} characters",
                tag, MIN_TAG_LEN
            ),
            TagError::InvalidCharacters { tag, invalid } => {
                let invalid = invalid.iter().collect::<String>();
                write!(
                    f,
                    "Tag \"{}\" contains invalid characters \"{}\" (valid: {})",
                    tag, invalid, TAG_ALPHABET
                )
            }
        }
    }
}

impl std::error::Error for TagError {}

/// A validated player or club tag, stored without its `#`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tag(String);

impl Tag {
    /// Strip the leading `#`, uppercase and validate `input`.
    ///
    /// With `normalize_letter_o` the letter `O` is read as the digit `0`,
    /// which is the usual typo for tags copied by hand.
    pub fn parse(input: &str, normalize_letter_o: bool) -> Result<Self, TagError> {
        let mut tag = input.trim().trim_start_matches('#').to_uppercase();
        if normalize_letter_o {
            tag = tag.replace('O', "0");
        }
        if tag.chars().count() < MIN_TAG_LEN {
            return Err(TagError::TooShort(tag));
        }
        let invalid = tag
            .chars()
            .filter(|c| !TAG_ALPHABET.contains(*c))
            .collect::<Vec<_>>();
        if !invalid.is_empty() {
            return Err(TagError::InvalidCharacters { tag, invalid });
        }
        Ok(Self(tag))
    }

    /// The canonical tag without `#`.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The tag as it goes into a URL path, `%23TAG` when `escape_prefix` is set.
    pub fn path_segment(&self, escape_prefix: bool) -> String {
        if escape_prefix {
            format!("%23{}", self.0)
        } else {
            self.0.clone()
        }
    }
}

impl Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl FromStr for Tag {
    type Err = TagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tag::parse(s, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_case_and_prefix() {
        let tag = Tag::parse("#ggjvjlu2", true).unwrap();
        assert_eq!(tag.as_str(), "GGJVJLU2");
        assert_eq!(tag.to_string(), "#GGJVJLU2");
    }

    #[test]
    fn normalization_is_idempotent() {
        let once = Tag::parse("GGJVJLU2", true).unwrap();
        let twice = Tag::parse(once.as_str(), true).unwrap();
        assert_eq!(once, twice);
        let from_display = Tag::parse(&once.to_string(), true).unwrap();
        assert_eq!(once, from_display);
    }

    #[test]
    fn too_short() {
        assert_eq!(
            Tag::parse("P", true),
            Err(TagError::TooShort("P".to_string()))
        );
        assert!(matches!(Tag::parse("#", true), Err(TagError::TooShort(_))));
        assert!(matches!(Tag::parse("#2PY", true), Ok(_)));
    }

    #[test]
    fn invalid_characters_are_reported() {
        match Tag::parse("AAA", true) {
            Err(TagError::InvalidCharacters { tag, invalid }) => {
                assert_eq!(tag, "AAA");
                assert_eq!(invalid, vec!['A', 'A', 'A']);
            }
            other => panic!("unexpected {:?}", other),
        }
        match Tag::parse("#PY1X", true) {
            Err(TagError::InvalidCharacters { invalid, .. }) => {
                assert_eq!(invalid, vec!['1', 'X'])
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn letter_o_is_configurable() {
        assert_eq!(Tag::parse("#2oo", true).unwrap().as_str(), "200");
        assert!(matches!(
            Tag::parse("#2oo", false),
            Err(TagError::InvalidCharacters { .. })
        ));
    }

    #[test]
    fn path_segment() {
        let tag: Tag = "qcgv8pg".parse().unwrap();
        assert_eq!(tag.path_segment(true), "%23QCGV8PG");
        assert_eq!(tag.path_segment(false), "QCGV8PG");
    }
}
