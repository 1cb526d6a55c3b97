//! `#tag` extraction from free-form task input.

/// Split `input` into display text and tags.
///
/// Whitespace-delimited tokens that start with `#` and have something after
/// it become tags (without the `#`). Everything else is kept, re-joined with
/// single spaces. A bare `#` is ordinary text.
pub fn parse_tags(input: &str) -> (String, Vec<String>) {
    let mut words = Vec::new();
    let mut tags = Vec::new();

    for token in input.split_whitespace() {
        match token.strip_prefix('#') {
            Some(tag) if !tag.is_empty() => tags.push(tag.to_string()),
            _ => words.push(token),
        }
    }

    (words.join(" "), tags)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn trailing_tags_are_extracted() {
        let (text, tags) = parse_tags("Build API #coding #backend");
        assert_eq!(text, "Build API");
        assert_eq!(tags, vec!["coding", "backend"]);
    }

    #[test]
    fn tags_only_leaves_empty_text() {
        let (text, tags) = parse_tags("#coding #backend");
        assert_eq!(text, "");
        assert_eq!(tags, vec!["coding", "backend"]);
    }

    #[test]
    fn bare_hash_is_not_a_tag() {
        let (text, tags) = parse_tags("Build # something");
        assert_eq!(text, "Build # something");
        assert!(tags.is_empty());
    }

    #[test]
    fn tags_in_the_middle_and_extra_whitespace() {
        let (text, tags) = parse_tags("  Fix   #bug login   flow ");
        assert_eq!(text, "Fix login flow");
        assert_eq!(tags, vec!["bug"]);
    }

    proptest! {
        #[test]
        fn no_tag_survives_in_text(input in "[a-z# ]{0,40}") {
            let (text, tags) = parse_tags(&input);
            for word in text.split_whitespace() {
                prop_assert!(word == "#" || !word.starts_with('#'));
            }
            prop_assert!(tags.iter().all(|t| !t.is_empty()));
        }
    }
}
