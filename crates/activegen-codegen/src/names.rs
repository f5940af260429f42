use crate::php::lower_first;

use activegen_core::schema::{ForeignKey, Name, Schema};
use activegen_core::Pluralizer;

/// Derives the canonical identifiers for a relation, in both directions.
///
/// Resolution is deterministic for a fixed schema: identifiers depend only on
/// declaration order and the supplied pluralizer. When more than one key
/// connects the same ordered table pair, every identifier for those keys gets
/// a `RelatedBy` suffix built from the key's local column names, so the keys
/// cannot collide in the generated class.
pub struct NameResolver<'a> {
    schema: &'a Schema,
    pluralizer: &'a dyn Pluralizer,
}

impl<'a> NameResolver<'a> {
    pub fn new(schema: &'a Schema, pluralizer: &'a dyn Pluralizer) -> Self {
        Self { schema, pluralizer }
    }

    pub(crate) fn pluralize(&self, word: &str) -> String {
        self.pluralizer.pluralize(word)
    }

    /// Identifier of the relation as seen from the declaring table.
    pub fn identifier(&self, fk: &ForeignKey, plural: bool, lowercase_first: bool) -> String {
        let base = match &fk.name {
            Some(name) => Name::new(name).upper_camel_case(),
            None => {
                let mut base = fk.target_table(self.schema).php_name();
                if self.is_ambiguous(fk) {
                    base.push_str(&self.related_by_suffix(fk));
                }
                base
            }
        };

        self.finish(base, plural, lowercase_first)
    }

    /// Identifier of the relation as seen from the referenced table.
    pub fn reversed_identifier(
        &self,
        fk: &ForeignKey,
        plural: bool,
        lowercase_first: bool,
    ) -> String {
        let mut base = fk.source_table(self.schema).php_name();
        if self.is_ambiguous(fk) {
            base.push_str(&self.related_by_suffix(fk));
        }

        self.finish(base, plural, lowercase_first)
    }

    fn finish(&self, mut name: String, plural: bool, lowercase_first: bool) -> String {
        if plural {
            name = self.pluralizer.pluralize(&name);
        }
        if lowercase_first {
            name = lower_first(&name);
        }
        name
    }

    /// Schema-global check: does any other key connect the same ordered table
    /// pair? Uses the pair index computed at schema build time.
    fn is_ambiguous(&self, fk: &ForeignKey) -> bool {
        self.schema
            .foreign_keys_between(fk.source(), fk.target)
            .len()
            > 1
    }

    /// `RelatedBy` suffix derived from the key's local column names.
    fn related_by_suffix(&self, fk: &ForeignKey) -> String {
        let mut suffix = String::from("RelatedBy");
        for local in fk.local_columns() {
            suffix.push_str(&self.schema.column(local).php_name());
        }
        suffix
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use activegen_core::schema::ColumnType;
    use activegen_core::EnglishPluralizer;

    fn two_key_schema() -> Schema {
        let mut builder = Schema::builder();

        let author = builder.table("author");
        author.column("id", ColumnType::Integer).primary_key();

        let book = builder.table("book");
        book.column("id", ColumnType::Integer).primary_key();
        book.column("first_author_id", ColumnType::Integer);
        book.column("second_author_id", ColumnType::Integer);
        book.foreign_key("author").pair("first_author_id", "id");
        book.foreign_key("author").pair("second_author_id", "id");

        builder.build().unwrap()
    }

    #[test]
    fn disambiguates_multiple_keys_between_the_same_pair() {
        let schema = two_key_schema();
        let pluralizer = EnglishPluralizer;
        let resolver = NameResolver::new(&schema, &pluralizer);
        let book = schema.table_by_name("book").unwrap();

        let first = resolver.identifier(&book.foreign_keys[0], false, false);
        let second = resolver.identifier(&book.foreign_keys[1], false, false);

        assert_eq!(first, "AuthorRelatedByFirstAuthorId");
        assert_eq!(second, "AuthorRelatedBySecondAuthorId");
        assert_ne!(first, second);

        let first_rev = resolver.reversed_identifier(&book.foreign_keys[0], true, false);
        assert_eq!(first_rev, "BookRelatedByFirstAuthorIds");
    }

    #[test]
    fn single_key_needs_no_suffix() {
        let mut builder = Schema::builder();
        let author = builder.table("author");
        author.column("id", ColumnType::Integer).primary_key();
        let book = builder.table("book");
        book.column("id", ColumnType::Integer).primary_key();
        book.column("author_id", ColumnType::Integer);
        book.foreign_key("author").pair("author_id", "id");
        let schema = builder.build().unwrap();

        let pluralizer = EnglishPluralizer;
        let resolver = NameResolver::new(&schema, &pluralizer);
        let book = schema.table_by_name("book").unwrap();

        assert_eq!(resolver.identifier(&book.foreign_keys[0], false, false), "Author");
        assert_eq!(resolver.reversed_identifier(&book.foreign_keys[0], true, false), "Books");
        assert_eq!(resolver.reversed_identifier(&book.foreign_keys[0], false, true), "book");
    }

    #[test]
    fn explicit_name_wins_and_still_pluralizes() {
        let mut builder = Schema::builder();
        let team = builder.table("team");
        team.column("id", ColumnType::Integer).primary_key();
        let user = builder.table("user");
        user.column("id", ColumnType::Integer).primary_key();
        user.column("team_id", ColumnType::Integer);
        user.foreign_key("team").pair("team_id", "id").named("LeTeam");
        let schema = builder.build().unwrap();

        let pluralizer = EnglishPluralizer;
        let resolver = NameResolver::new(&schema, &pluralizer);
        let user = schema.table_by_name("user").unwrap();

        assert_eq!(resolver.identifier(&user.foreign_keys[0], false, false), "LeTeam");
        assert_eq!(resolver.identifier(&user.foreign_keys[0], true, false), "LeTeams");
        assert_eq!(resolver.identifier(&user.foreign_keys[0], false, true), "leTeam");
    }

    #[test]
    fn resolution_is_deterministic() {
        let schema = two_key_schema();
        let pluralizer = EnglishPluralizer;
        let resolver = NameResolver::new(&schema, &pluralizer);
        let book = schema.table_by_name("book").unwrap();

        let a = resolver.identifier(&book.foreign_keys[0], true, false);
        let b = resolver.identifier(&book.foreign_keys[0], true, false);
        assert_eq!(a, b);
    }
}
