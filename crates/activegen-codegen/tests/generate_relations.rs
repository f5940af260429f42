use activegen_codegen::{generate, CodegenError, Config};
use activegen_core::schema::{ColumnType, OnDelete, Schema};
use activegen_core::EnglishPluralizer;

use pretty_assertions::assert_eq;

fn author_book_schema(required: bool, cascade: bool) -> Schema {
    let mut builder = Schema::builder();

    let author = builder.table("author");
    author.column("id", ColumnType::Integer).primary_key();

    let book = builder.table("book");
    book.column("id", ColumnType::Integer).primary_key();
    let author_id = book.column("author_id", ColumnType::Integer);
    if required {
        author_id.required();
    }
    let fk = book.foreign_key("author").pair("author_id", "id");
    if cascade {
        fk.on_delete(OnDelete::Cascade);
    }

    builder.build().unwrap()
}

fn many_to_many_schema() -> Schema {
    let mut builder = Schema::builder();

    let user = builder.table("user");
    user.column("id", ColumnType::Integer).primary_key();

    let team = builder.table("team");
    team.column("id", ColumnType::Integer).primary_key();

    let middle = builder.table("team_user");
    middle.cross_ref();
    middle.column("team_id", ColumnType::Integer).primary_key();
    middle.column("user_id", ColumnType::Integer).primary_key();
    middle
        .foreign_key("team")
        .pair("team_id", "id")
        .named("LeTeam");
    middle.foreign_key("user").pair("user_id", "id");

    builder.build().unwrap()
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

#[test]
fn outgoing_key_emits_cached_reference_surface() {
    let schema = author_book_schema(false, false);
    let book = schema.table_by_name("book").unwrap();
    let pluralizer = EnglishPluralizer;

    let fragments = generate(&schema, book, &pluralizer, &Config::default()).unwrap();

    assert!(fragments.attributes.contains("protected $aAuthor;"));
    assert!(fragments
        .methods
        .contains("public function setAuthor(?Author $v = null)"));
    assert!(fragments.methods.contains(
        "public function getAuthor(?ConnectionInterface $con = null, bool $doQuery = true)"
    ));
    // The key covers the target's primary key, so resolution goes by pk.
    assert!(fragments
        .methods
        .contains("AuthorQuery::create()->findPk($this->author_id, $con)"));
    // Referenced object saves before this row.
    assert!(fragments.save_code.contains("$this->aAuthor->save($con)"));

    // Mutating the local column invalidates the cached reference.
    let reset = fragments.column_mutator_resets.get("author_id").unwrap();
    assert!(reset.contains("$this->aAuthor !== null && $this->aAuthor->getId() !== $v"));
    assert!(fragments.column_mutator_resets.get("id").is_none());
}

#[test]
fn one_to_many_referrer_emits_collection_surface() {
    let schema = author_book_schema(false, false);
    let author = schema.table_by_name("author").unwrap();
    let pluralizer = EnglishPluralizer;

    let fragments = generate(&schema, author, &pluralizer, &Config::default()).unwrap();

    assert!(fragments.attributes.contains("protected $collBooks;"));
    assert!(fragments.attributes.contains("protected $collBooksPartial;"));
    assert!(fragments
        .scheduled_attributes
        .contains("protected $booksScheduledForDeletion = null;"));

    for method in [
        "public function clearBooks()",
        "public function initBooks(bool $overrideExisting = true): void",
        "public function getBooks(?Criteria $criteria = null, ?ConnectionInterface $con = null)",
        "public function setBooks(Collection $books, ?ConnectionInterface $con = null)",
        "public function countBooks(?Criteria $criteria = null, bool $distinct = false, ?ConnectionInterface $con = null): int",
        "public function addBook(Book $l)",
        "protected function doAddBook(Book $book): void",
        "public function removeBook(Book $book)",
    ] {
        assert!(fragments.methods.contains(method), "missing: {method}");
    }

    assert!(fragments
        .methods
        .contains("->filterByAuthor($this)\n                ->find($con)"));
    assert!(fragments.on_reload.contains("$this->collBooks = null;"));
    assert!(fragments.cleared_attributes.contains(&"collBooks".to_string()));

    let classes: Vec<&str> = fragments.imports.classes().collect();
    assert!(classes.contains(&"Model\\Book"));
    assert!(classes.contains(&"Model\\BookQuery"));
    assert!(classes.contains(&"Runtime\\Collection\\ObjectCollection"));
}

#[test]
fn optional_key_reuses_the_removed_child_and_saves_it() {
    let schema = author_book_schema(false, false);
    let author = schema.table_by_name("author").unwrap();
    let pluralizer = EnglishPluralizer;

    let fragments = generate(&schema, author, &pluralizer, &Config::default()).unwrap();

    // Nullable single-column key: the live child is staged, not a clone.
    assert!(fragments
        .methods
        .contains("$this->booksScheduledForDeletion[] = $book;"));
    assert!(!fragments
        .methods
        .contains("$this->booksScheduledForDeletion[] = clone $book;"));

    // Each staged child persists its nulled-out key itself.
    assert!(fragments.save_code.contains("$book->save($con);"));
    assert!(!fragments.save_code.contains("filterByPrimaryKeys"));
}

#[test]
fn required_cascading_key_clones_and_bulk_deletes() {
    let schema = author_book_schema(true, true);
    let author = schema.table_by_name("author").unwrap();
    let pluralizer = EnglishPluralizer;

    let fragments = generate(&schema, author, &pluralizer, &Config::default()).unwrap();

    assert!(fragments
        .methods
        .contains("$this->booksScheduledForDeletion[] = clone $book;"));
    assert!(fragments.save_code.contains(
        "BookQuery::create()\n            ->filterByPrimaryKeys($this->booksScheduledForDeletion->getPrimaryKeys(false))\n            ->delete($con);"
    ));
}

#[test]
fn primary_key_referrer_emits_single_reference() {
    let mut builder = Schema::builder();
    let user = builder.table("user");
    user.column("id", ColumnType::Integer).primary_key();
    let profile = builder.table("profile");
    profile.column("user_id", ColumnType::Integer).primary_key();
    profile.column("bio", ColumnType::Text);
    profile.foreign_key("user").pair("user_id", "id");
    let schema = builder.build().unwrap();
    let pluralizer = EnglishPluralizer;

    let user = schema.table_by_name("user").unwrap();
    let fragments = generate(&schema, user, &pluralizer, &Config::default()).unwrap();

    assert!(fragments.attributes.contains("protected $singleProfile;"));
    assert!(fragments
        .methods
        .contains("public function getProfile(?ConnectionInterface $con = null)"));
    assert!(fragments
        .methods
        .contains("public function setProfile(?Profile $v = null)"));
    assert!(fragments
        .methods
        .contains("ProfileQuery::create()->findPk($this->getPrimaryKey(), $con)"));

    // Back-linking only touches the unset side; the non-querying probe
    // prevents a lookup from inside the setter.
    assert!(fragments
        .methods
        .contains("if ($v !== null && $v->getUser(null, false) === null)"));
    assert!(!fragments.methods.contains("collProfiles"));

    // The declaring side still gets a plain outgoing-key surface.
    let profile = schema.table_by_name("profile").unwrap();
    let fragments = generate(&schema, profile, &pluralizer, &Config::default()).unwrap();
    assert!(fragments.methods.contains("$v->setProfile($this);"));
}

#[test]
fn many_to_many_uses_the_declared_key_name() {
    let schema = many_to_many_schema();
    let user = schema.table_by_name("user").unwrap();
    let pluralizer = EnglishPluralizer;

    let fragments = generate(&schema, user, &pluralizer, &Config::default()).unwrap();

    assert!(fragments.attributes.contains("protected $collLeTeams;"));
    for method in [
        "public function clearLeTeams()",
        "public function initLeTeams(): void",
        "public function isLeTeamsLoaded(): bool",
        "public function getLeTeams(?Criteria $criteria = null, ?ConnectionInterface $con = null)",
        "public function setLeTeams(Collection $leTeams, ?ConnectionInterface $con = null)",
        "public function addLeTeam(Team $leTeam)",
        "protected function doAddLeTeam(Team $leTeam): void",
        "public function removeLeTeam(Team $leTeam)",
    ] {
        assert!(fragments.methods.contains(method), "missing: {method}");
    }

    // Membership rows route through the junction collection.
    assert!(fragments.methods.contains("$teamUser = new TeamUser();"));
    assert!(fragments.methods.contains("$teamUser->setLeTeam($leTeam);"));
    assert!(fragments.methods.contains("$teamUser->setUser($this);"));
    assert!(fragments.methods.contains("$this->addTeamUser($teamUser);"));

    // Reverse collection maintenance never forces a load on the far side.
    assert!(fragments.methods.contains(
        "if ($leTeam->isUsersLoaded() && !$leTeam->getUsers()->contains($this))"
    ));
}

#[test]
fn many_to_many_save_rebuilds_junction_keys_by_declared_position() {
    let schema = many_to_many_schema();
    let user = schema.table_by_name("user").unwrap();
    let pluralizer = EnglishPluralizer;

    let fragments = generate(&schema, user, &pluralizer, &Config::default()).unwrap();

    // team_user declares (team_id, user_id); the user side fills slot 1 from
    // itself and slot 0 from the staged target, regardless of walk order.
    assert!(fragments
        .save_code
        .contains("$entryPk[1] = $this->getId();"));
    assert!(fragments
        .save_code
        .contains("$entryPk[0] = $entry->getId();"));
    assert!(fragments.save_code.contains(
        "TeamUserQuery::create()\n            ->filterByPrimaryKeys($pks)\n            ->delete($con);"
    ));
}

#[test]
fn ternary_relation_emits_combination_surface() {
    let schema = ternary_schema();
    let user = schema.table_by_name("user").unwrap();
    let pluralizer = EnglishPluralizer;

    let fragments = generate(&schema, user, &pluralizer, &Config::default()).unwrap();

    assert!(fragments
        .attributes
        .contains("protected $combinationTeamDayTypes;"));
    assert!(fragments
        .scheduled_attributes
        .contains("protected $teamDayTypesScheduledForDeletion = null;"));

    // Adding names only the object participants; the full tuple names
    // removal and retrieval.
    assert!(fragments
        .methods
        .contains("public function addTeam(Team $team, string $day, int $type)"));
    assert!(fragments
        .methods
        .contains("public function removeTeamDayType(Team $team, string $day, int $type)"));
    assert!(fragments.methods.contains(
        "public function getTeamDayTypes(?Criteria $criteria = null, ?ConnectionInterface $con = null)"
    ));
    assert!(fragments
        .methods
        .contains("public function isTeamDayTypesLoaded(): bool"));

    // Combinations fold as targets first, discriminators after.
    let fold = "                $combination[] = $item->getTeam();\n                $combination[] = $item->getDay();\n                $combination[] = $item->getType();\n";
    assert!(fragments.methods.contains(fold));

    // Eager fetch joins every target through the junction query.
    assert!(fragments
        .methods
        .contains("TeamUserQuery::create(null, $criteria)\n                ->filterByUser($this)\n                ->leftJoinWithTeam()"));

    let classes: Vec<&str> = fragments.imports.classes().collect();
    assert!(classes.contains(&"Runtime\\Collection\\ObjectCombinationCollection"));
}

#[test]
fn ternary_relation_keeps_both_sides_collections_symmetric() {
    let schema = ternary_schema();
    let user = schema.table_by_name("user").unwrap();
    let pluralizer = EnglishPluralizer;

    let fragments = generate(&schema, user, &pluralizer, &Config::default()).unwrap();

    // The reverse push names exactly what the team side derives for itself
    // (UserDayTypes) and swaps this object into the incoming slot.
    assert!(fragments.methods.contains(
        "if ($team->isUserDayTypesLoaded() && !$team->getUserDayTypes()->contains($this, $day, $type))"
    ));
    assert!(fragments
        .methods
        .contains("$team->getUserDayTypes()->push($this, $day, $type);"));
    assert!(fragments
        .methods
        .contains("$team->getUserDayTypes()->removeObject($this, $day, $type);"));

    let team = schema.table_by_name("team").unwrap();
    let team_fragments = generate(&schema, team, &pluralizer, &Config::default()).unwrap();
    assert!(team_fragments
        .methods
        .contains("public function getUserDayTypes("));
}

#[test]
fn ternary_save_interleaves_junction_key_slots() {
    let schema = ternary_schema();
    let user = schema.table_by_name("user").unwrap();
    let pluralizer = EnglishPluralizer;

    let fragments = generate(&schema, user, &pluralizer, &Config::default()).unwrap();

    // team_user declares (user_id, team_id, day, type).
    assert!(fragments
        .save_code
        .contains("$entryPk[0] = $this->getId();"));
    assert!(fragments
        .save_code
        .contains("$entryPk[1] = $combination[0]->getId();"));
    assert!(fragments.save_code.contains("$entryPk[2] = $combination[1];"));
    assert!(fragments.save_code.contains("$entryPk[3] = $combination[2];"));

    // Only object participants cascade-save.
    assert!(fragments.save_code.contains("$model = $combination[0];"));
    assert!(!fragments.save_code.contains("$model = $combination[1];"));
}

#[test]
fn ternary_relation_emits_per_target_query_helpers() {
    let schema = ternary_schema();
    let user = schema.table_by_name("user").unwrap();
    let pluralizer = EnglishPluralizer;

    let fragments = generate(&schema, user, &pluralizer, &Config::default()).unwrap();

    assert!(fragments.methods.contains(
        "public function createTeamsQuery(?string $day = null, ?int $type = null, ?Criteria $criteria = null)"
    ));
    assert!(fragments
        .methods
        .contains("$junction = $query->useTeamUserQuery()\n        ->filterByUser($this);"));
    assert!(fragments.methods.contains(
        "public function getTeams(?Criteria $criteria = null, ?ConnectionInterface $con = null)"
    ));
    assert!(fragments
        .methods
        .contains("return $this->createTeamsQuery(null, null, $criteria)->find($con);"));
    assert!(fragments.methods.contains(
        "public function countTeams(?Criteria $criteria = null, ?ConnectionInterface $con = null): int"
    ));
}

#[test]
fn generation_is_deterministic() {
    let schema = ternary_schema();
    let user = schema.table_by_name("user").unwrap();
    let pluralizer = EnglishPluralizer;
    let config = Config::default();

    let first = generate(&schema, user, &pluralizer, &config).unwrap();
    let second = generate(&schema, user, &pluralizer, &config).unwrap();

    assert_eq!(first.attributes, second.attributes);
    assert_eq!(first.scheduled_attributes, second.scheduled_attributes);
    assert_eq!(first.methods, second.methods);
    assert_eq!(first.on_reload, second.on_reload);
    assert_eq!(first.clear_references, second.clear_references);
    assert_eq!(first.save_code, second.save_code);
    assert_eq!(first.column_mutator_resets, second.column_mutator_resets);
}

#[test]
fn literal_pinned_columns_render_typed_literals() {
    let mut builder = Schema::builder();
    let kind = builder.table("kind");
    kind.column("id", ColumnType::Integer).primary_key();
    let item = builder.table("item");
    item.column("id", ColumnType::Integer).primary_key();
    item.column("kind_id", ColumnType::Integer);
    item.column("rank", ColumnType::Integer);
    item.column("flag", ColumnType::Varchar);
    item.foreign_key("kind")
        .pair("kind_id", "id")
        .literal_pair("rank", "1")
        .literal_pair("flag", "x");
    let schema = builder.build().unwrap();
    let pluralizer = EnglishPluralizer;

    let item = schema.table_by_name("item").unwrap();
    let fragments = generate(&schema, item, &pluralizer, &Config::default()).unwrap();

    // Pinned values keep the local column's type: numerics stay bare,
    // text gets quoted.
    assert!(fragments.methods.contains("$this->setRank(1);"));
    assert!(!fragments.methods.contains("$this->setRank('1');"));
    assert!(fragments.methods.contains("$this->setFlag('x');"));

    // Pinned columns take no part in the lazy-load guard or the lookup.
    assert!(fragments
        .methods
        .contains("KindQuery::create()->findPk($this->kind_id, $con)"));
    assert!(!fragments.methods.contains("$this->rank != 0"));
}

#[test]
fn relation_identifier_colliding_with_a_column_is_rejected() {
    let mut builder = Schema::builder();
    let author = builder.table("author");
    author.column("id", ColumnType::Integer).primary_key();
    let book = builder.table("book");
    book.column("id", ColumnType::Integer).primary_key();
    book.column("author", ColumnType::Varchar);
    book.column("author_id", ColumnType::Integer);
    book.foreign_key("author").pair("author_id", "id");
    let schema = builder.build().unwrap();
    let pluralizer = EnglishPluralizer;

    let book = schema.table_by_name("book").unwrap();
    let err = generate(&schema, book, &pluralizer, &Config::default()).unwrap_err();

    assert!(matches!(err, CodegenError::SchemaInconsistency { .. }));
    assert!(err.to_string().contains("`Author`"));
}

#[test]
fn duplicate_relation_identifiers_are_rejected() {
    // `author` both points at `book` and is pointed at by it, so its outgoing
    // identifier and the reversed referrer identifier both resolve to `Book`.
    let mut builder = Schema::builder();
    let author = builder.table("author");
    author.column("id", ColumnType::Integer).primary_key();
    author.column("favorite_book_id", ColumnType::Integer);
    author.foreign_key("book").pair("favorite_book_id", "id");
    let book = builder.table("book");
    book.column("id", ColumnType::Integer).primary_key();
    book.column("author_id", ColumnType::Integer);
    book.foreign_key("author").pair("author_id", "id");
    let schema = builder.build().unwrap();
    let pluralizer = EnglishPluralizer;

    let author = schema.table_by_name("author").unwrap();
    let err = generate(&schema, author, &pluralizer, &Config::default()).unwrap_err();

    assert!(matches!(
        err,
        CodegenError::NamingCollision { ref identifier, .. } if identifier == "Book"
    ));
}
