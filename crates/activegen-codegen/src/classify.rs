use activegen_core::schema::{CrossRelation, ForeignKey, Schema};

/// Shape of an incoming foreign key, seen from the referenced table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferrerShape {
    /// The declaring side's local columns are its full primary key, so at
    /// most one row can reference a given target row.
    OneToOne,
    OneToMany,
}

/// Shape of a cross relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrossShape {
    ManyToMany,
    /// More than one target model, or discriminator columns on the junction
    /// table; generated as fixed-order combination tuples.
    Ternary,
}

/// Classification is total over well-formed schema input: every incoming key
/// is exactly one of the two shapes. Malformed input (a 1:1 declared from
/// both sides) is rejected by schema verification before generation runs.
pub fn classify_referrer(schema: &Schema, fk: &ForeignKey) -> ReferrerShape {
    if fk.is_local_primary_key(schema) {
        ReferrerShape::OneToOne
    } else {
        ReferrerShape::OneToMany
    }
}

pub fn classify_cross(cross: &CrossRelation) -> CrossShape {
    if cross.is_multi_model() {
        CrossShape::Ternary
    } else {
        CrossShape::ManyToMany
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use activegen_core::schema::ColumnType;

    #[test]
    fn referrer_on_full_primary_key_is_one_to_one() {
        let mut builder = Schema::builder();
        let user = builder.table("user");
        user.column("id", ColumnType::Integer).primary_key();
        let profile = builder.table("profile");
        profile.column("user_id", ColumnType::Integer).primary_key();
        profile.foreign_key("user").pair("user_id", "id");
        let schema = builder.build().unwrap();

        let user = schema.table_by_name("user").unwrap();
        let fk = schema.foreign_key(user.referrers[0]);
        assert_eq!(classify_referrer(&schema, fk), ReferrerShape::OneToOne);
    }

    #[test]
    fn referrer_outside_primary_key_is_one_to_many() {
        let mut builder = Schema::builder();
        let author = builder.table("author");
        author.column("id", ColumnType::Integer).primary_key();
        let book = builder.table("book");
        book.column("id", ColumnType::Integer).primary_key();
        book.column("author_id", ColumnType::Integer);
        book.foreign_key("author").pair("author_id", "id");
        let schema = builder.build().unwrap();

        let author = schema.table_by_name("author").unwrap();
        let fk = schema.foreign_key(author.referrers[0]);
        assert_eq!(classify_referrer(&schema, fk), ReferrerShape::OneToMany);
    }

    #[test]
    fn two_crossing_keys_are_ternary_even_without_discriminators() {
        let mut builder = Schema::builder();
        let user = builder.table("user");
        user.column("id", ColumnType::Integer).primary_key();
        let team = builder.table("team");
        team.column("id", ColumnType::Integer).primary_key();
        let event = builder.table("event");
        event.column("id", ColumnType::Integer).primary_key();

        let middle = builder.table("user_team_event");
        middle.cross_ref();
        middle.column("user_id", ColumnType::Integer).primary_key();
        middle.column("team_id", ColumnType::Integer).primary_key();
        middle.column("event_id", ColumnType::Integer).primary_key();
        middle.foreign_key("user").pair("user_id", "id");
        middle.foreign_key("team").pair("team_id", "id");
        middle.foreign_key("event").pair("event_id", "id");
        let schema = builder.build().unwrap();

        let user = schema.table_by_name("user").unwrap();
        let cross = &user.cross_relations[0];
        assert_eq!(cross.crossing.len(), 2);
        assert!(cross.unclassified_primary_keys.is_empty());
        assert_eq!(classify_cross(cross), CrossShape::Ternary);
    }

    #[test]
    fn single_crossing_key_without_discriminators_is_many_to_many() {
        let mut builder = Schema::builder();
        let user = builder.table("user");
        user.column("id", ColumnType::Integer).primary_key();
        let team = builder.table("team");
        team.column("id", ColumnType::Integer).primary_key();

        let middle = builder.table("team_user");
        middle.cross_ref();
        middle.column("team_id", ColumnType::Integer).primary_key();
        middle.column("user_id", ColumnType::Integer).primary_key();
        middle.foreign_key("team").pair("team_id", "id");
        middle.foreign_key("user").pair("user_id", "id");
        let schema = builder.build().unwrap();

        let user = schema.table_by_name("user").unwrap();
        assert_eq!(classify_cross(&user.cross_relations[0]), CrossShape::ManyToMany);
    }
}
