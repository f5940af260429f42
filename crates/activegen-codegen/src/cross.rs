use crate::names::NameResolver;
use crate::php::lower_first;

use activegen_core::schema::{Column, CrossRelation, ForeignKey, ForeignKeyId, Schema, Table};

/// Composite naming for a classified cross relation.
///
/// The target identifier concatenates each crossing key's forward identifier
/// in declaration order, followed by any unclassified primary key column
/// names. Pluralization placement is asymmetric on purpose: a chain of type
/// names pluralizes only its trailing component (`TeamEvent` becomes
/// `TeamEvents`), while a chain ending in scalar discriminators no longer
/// reads as a compound type name and pluralizes as a unit (`TeamDayType`
/// becomes `TeamDayTypes` via the pluralizer applied to the whole string).
pub struct CrossRelationNames<'a> {
    schema: &'a Schema,
    resolver: &'a NameResolver<'a>,
    cross: &'a CrossRelation,
}

impl<'a> CrossRelationNames<'a> {
    pub fn new(
        schema: &'a Schema,
        resolver: &'a NameResolver<'a>,
        cross: &'a CrossRelation,
    ) -> Self {
        Self {
            schema,
            resolver,
            cross,
        }
    }

    pub fn middle_table(&self) -> &'a Table {
        self.schema.table(self.cross.middle)
    }

    pub fn incoming(&self) -> &'a ForeignKey {
        self.schema.foreign_key(self.cross.incoming)
    }

    pub fn crossing(&self) -> impl Iterator<Item = &'a ForeignKey> + '_ {
        self.cross
            .crossing
            .iter()
            .map(|id| self.schema.foreign_key(*id))
    }

    pub fn unclassified(&self) -> impl Iterator<Item = &'a Column> + '_ {
        self.cross
            .unclassified_primary_keys
            .iter()
            .map(|id| self.schema.column(*id))
    }

    /// Compound identifier of the relation targets.
    pub fn target_identifier(&self, plural: bool) -> String {
        let tokens: Vec<String> = self
            .crossing()
            .map(|fk| self.resolver.identifier(fk, false, false))
            .collect();
        let unclassified: Vec<String> = self.unclassified().map(|c| c.php_name()).collect();

        self.compose(tokens, unclassified, plural)
    }

    /// Identifier naming the `add` method: the crossing targets only,
    /// without discriminator columns.
    pub fn add_identifier(&self) -> String {
        self.crossing()
            .map(|fk| self.resolver.identifier(fk, false, false))
            .collect()
    }

    /// Identifier of the side owning the collection attribute.
    pub fn source_identifier(&self, plural: bool) -> String {
        self.resolver.identifier(self.incoming(), plural, false)
    }

    /// Name of the collection attribute storing related objects.
    pub fn attribute_collection_name(&self) -> String {
        if self.cross.is_multi_model() {
            format!("combination{}", self.target_identifier(true))
        } else {
            format!("coll{}", self.target_identifier(true))
        }
    }

    pub fn attribute_partial_name(&self) -> String {
        format!("{}Partial", self.attribute_collection_name())
    }

    pub fn attribute_scheduled_for_deletion_name(&self) -> String {
        lower_first(&format!("{}ScheduledForDeletion", self.target_identifier(true)))
    }

    /// Reverse identifier of the incoming key; names the junction-table
    /// collection the `add` method routes through.
    pub fn middle_table_identifier(&self, plural: bool) -> String {
        self.resolver
            .reversed_identifier(self.incoming(), plural, false)
    }

    /// The compound identifier of this relation as seen from `target`'s own
    /// side: every junction participant except `target`, in the junction
    /// table's key declaration order, followed by the discriminator columns.
    ///
    /// Matches what `target`'s own cross-relation generation derives, so
    /// back-linking code can name the reverse collection without consulting
    /// the target's producer.
    pub fn reverse_identifier_for(&self, target: ForeignKeyId, plural: bool) -> String {
        let tokens: Vec<String> = self
            .middle_table()
            .foreign_keys
            .iter()
            .filter(|fk| fk.id != target)
            .map(|fk| self.resolver.identifier(fk, false, false))
            .collect();
        let unclassified: Vec<String> = self.unclassified().map(|c| c.php_name()).collect();

        self.compose(tokens, unclassified, plural)
    }

    fn compose(&self, tokens: Vec<String>, unclassified: Vec<String>, plural: bool) -> String {
        if unclassified.is_empty() {
            let mut tokens = tokens;
            if plural {
                if let Some(last) = tokens.pop() {
                    tokens.push(self.resolver.pluralize(&last));
                }
            }
            tokens.concat()
        } else {
            let whole = tokens.concat() + &unclassified.concat();
            if plural {
                self.resolver.pluralize(&whole)
            } else {
                whole
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use activegen_core::schema::ColumnType;
    use activegen_core::{EnglishPluralizer, Pluralizer};

    /// Pluralizer with an irregular noun, to make pluralization placement
    /// observable in the composed identifiers.
    struct IrregularPluralizer;

    impl Pluralizer for IrregularPluralizer {
        fn pluralize(&self, word: &str) -> String {
            if let Some(stem) = word.strip_suffix("Person") {
                format!("{stem}People")
            } else {
                format!("{word}s")
            }
        }
    }

    fn ternary_schema() -> Schema {
        let mut builder = Schema::builder();

        let user = builder.table("user");
        user.column("id", ColumnType::Integer).primary_key();

        let team = builder.table("team");
        team.column("id", ColumnType::Integer).primary_key();

        let middle = builder.table("team_user");
        middle.cross_ref();
        middle.column("user_id", ColumnType::Integer).primary_key();
        middle.column("team_id", ColumnType::Integer).primary_key();
        middle.column("day", ColumnType::Varchar).primary_key();
        middle.column("type", ColumnType::Integer).primary_key();
        middle.foreign_key("user").pair("user_id", "id");
        middle.foreign_key("team").pair("team_id", "id");

        builder.build().unwrap()
    }

    fn binary_multi_target_schema() -> Schema {
        let mut builder = Schema::builder();

        let user = builder.table("user");
        user.column("id", ColumnType::Integer).primary_key();

        let team = builder.table("team");
        team.column("id", ColumnType::Integer).primary_key();

        let person = builder.table("person");
        person.column("id", ColumnType::Integer).primary_key();

        let middle = builder.table("membership");
        middle.cross_ref();
        middle.column("user_id", ColumnType::Integer).primary_key();
        middle.column("team_id", ColumnType::Integer).primary_key();
        middle.column("person_id", ColumnType::Integer).primary_key();
        middle.foreign_key("user").pair("user_id", "id");
        middle.foreign_key("team").pair("team_id", "id");
        middle.foreign_key("person").pair("person_id", "id");

        builder.build().unwrap()
    }

    #[test]
    fn pluralizes_only_the_trailing_type_name() {
        let schema = binary_multi_target_schema();
        let pluralizer = IrregularPluralizer;
        let resolver = NameResolver::new(&schema, &pluralizer);

        let user = schema.table_by_name("user").unwrap();
        let names = CrossRelationNames::new(&schema, &resolver, &user.cross_relations[0]);

        assert_eq!(names.target_identifier(false), "TeamPerson");
        // Only `Person` is pluralized; `Team` stays singular.
        assert_eq!(names.target_identifier(true), "TeamPeople");
    }

    #[test]
    fn pluralizes_the_whole_compound_with_trailing_discriminators() {
        let schema = ternary_schema();
        let pluralizer = EnglishPluralizer;
        let resolver = NameResolver::new(&schema, &pluralizer);

        let user = schema.table_by_name("user").unwrap();
        let names = CrossRelationNames::new(&schema, &resolver, &user.cross_relations[0]);

        assert_eq!(names.target_identifier(false), "TeamDayType");
        assert_eq!(names.target_identifier(true), "TeamDayTypes");
        assert_eq!(names.attribute_collection_name(), "combinationTeamDayTypes");
        assert_eq!(
            names.attribute_scheduled_for_deletion_name(),
            "teamDayTypesScheduledForDeletion"
        );
        assert_eq!(names.add_identifier(), "Team");
        assert_eq!(names.source_identifier(false), "User");
        assert_eq!(names.middle_table_identifier(false), "TeamUser");
    }

    #[test]
    fn reverse_identifier_matches_the_target_sides_own_derivation() {
        let schema = ternary_schema();
        let pluralizer = EnglishPluralizer;
        let resolver = NameResolver::new(&schema, &pluralizer);

        let user = schema.table_by_name("user").unwrap();
        let team = schema.table_by_name("team").unwrap();

        let from_user = CrossRelationNames::new(&schema, &resolver, &user.cross_relations[0]);
        let team_fk = from_user.crossing().next().unwrap().id;

        let from_team = CrossRelationNames::new(&schema, &resolver, &team.cross_relations[0]);

        assert_eq!(
            from_user.reverse_identifier_for(team_fk, true),
            from_team.target_identifier(true)
        );
        assert_eq!(from_team.target_identifier(true), "UserDayTypes");
    }

    #[test]
    fn binary_collection_attribute_uses_coll_prefix() {
        let mut builder = Schema::builder();
        let user = builder.table("user");
        user.column("id", ColumnType::Integer).primary_key();
        let team = builder.table("team");
        team.column("id", ColumnType::Integer).primary_key();
        let middle = builder.table("team_user");
        middle.cross_ref();
        middle.column("user_id", ColumnType::Integer).primary_key();
        middle.column("team_id", ColumnType::Integer).primary_key();
        middle.foreign_key("user").pair("user_id", "id");
        middle.foreign_key("team").pair("team_id", "id");
        let schema = builder.build().unwrap();

        let pluralizer = EnglishPluralizer;
        let resolver = NameResolver::new(&schema, &pluralizer);
        let user = schema.table_by_name("user").unwrap();
        let names = CrossRelationNames::new(&schema, &resolver, &user.cross_relations[0]);

        assert_eq!(names.attribute_collection_name(), "collTeams");
        assert_eq!(names.attribute_partial_name(), "collTeamsPartial");
    }
}
