/// Produces the plural form of an identifier.
///
/// Supplied to the generator from the outside; identifier resolution applies
/// it to fully composed names only, never to individual name parts.
pub trait Pluralizer {
    fn pluralize(&self, word: &str) -> String;
}

/// Default pluralizer backed by the `pluralizer` crate's English inflection
/// rules.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnglishPluralizer;

impl Pluralizer for EnglishPluralizer {
    fn pluralize(&self, word: &str) -> String {
        pluralizer::pluralize(word, 2, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn pluralizes_simple_nouns() {
        let p = EnglishPluralizer;
        assert_eq!(p.pluralize("Book"), "Books");
        assert_eq!(p.pluralize("Team"), "Teams");
    }
}
