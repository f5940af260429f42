mod fk;
mod many_to_many;
mod one_to_many;
mod one_to_one;
mod ternary;

use fk::ForeignKeyProducer;
use many_to_many::ManyToManyProducer;
use one_to_many::OneToManyProducer;
use one_to_one::OneToOneProducer;
use ternary::TernaryProducer;

use crate::classify::{classify_cross, classify_referrer, CrossShape, ReferrerShape};
use crate::cross::CrossRelationNames;
use crate::error::{CodegenError, Result};
use crate::imports::ImportRegistry;
use crate::names::NameResolver;

use activegen_core::schema::{Column, ColumnId, Schema, Table};
use activegen_core::Pluralizer;

use indexmap::IndexMap;

/// Generator configuration passed through to the producers. String values are
/// opaque to the generator; they name methods and namespaces resolved by the
/// generated code's runtime.
#[derive(Debug, Clone)]
pub struct Config {
    /// Namespace the generated model classes live in.
    pub model_namespace: String,

    /// Namespace prefix of the runtime support classes.
    pub runtime_namespace: String,

    /// Join method used when eagerly fetching cross-relation targets.
    pub join_with_method: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model_namespace: "Model".to_string(),
            runtime_namespace: "Runtime".to_string(),
            join_with_method: "leftJoinWith".to_string(),
        }
    }
}

/// The text fragments produced for one table, consumed by the enclosing
/// class builder. Ordering within each fragment follows relation declaration
/// order: outgoing keys, then referrers, then cross relations.
#[derive(Debug, Default)]
pub struct RelationFragments {
    /// Relation storage attribute declarations.
    pub attributes: String,

    /// Scheduled-for-deletion attribute declarations.
    pub scheduled_attributes: String,

    /// Full method bodies.
    pub methods: String,

    /// Statements resetting cached relation state, emitted into the object's
    /// reload routine.
    pub on_reload: String,

    /// Statements breaking backreferences on loaded related objects, emitted
    /// into the object's clearAllReferences routine.
    pub clear_references: String,

    /// Attribute names the clearAllReferences routine must null out after
    /// running the statements above.
    pub cleared_attributes: Vec<String>,

    /// Save-time statements per relation: staged deletions followed by
    /// cascading saves, in relation order.
    pub save_code: String,

    /// Cached-reference invalidation statements, keyed by the local column's
    /// snake_case name, emitted into that column's mutator.
    pub column_mutator_resets: IndexMap<String, String>,

    /// Classes referenced by the fragments.
    pub imports: ImportRegistry,
}

/// Statements and attribute names contributed to clearAllReferences.
pub(crate) struct ClearReferences {
    pub statements: String,
    pub attributes: Vec<String>,
}

/// One code-generation strategy per classified relation shape.
pub(crate) trait RelationCodeProducer {
    fn attributes(&self, imports: &mut ImportRegistry) -> String;

    fn scheduled_attribute(&self, imports: &mut ImportRegistry) -> String {
        let _ = imports;
        String::new()
    }

    fn methods(&self, imports: &mut ImportRegistry) -> String;

    fn on_reload(&self) -> String;

    fn clear_references(&self) -> ClearReferences;

    fn save_code(&self, imports: &mut ImportRegistry) -> String;

    /// Invalidation guard for the mutator of `column`, when mutating it can
    /// leave a cached related object stale.
    fn column_mutator_reset(&self, column: &Column) -> Option<String> {
        let _ = column;
        None
    }
}

/// Generates the relationship fragments for one table.
pub fn generate(
    schema: &Schema,
    table: &Table,
    pluralizer: &dyn Pluralizer,
    config: &Config,
) -> Result<RelationFragments> {
    Expand {
        schema,
        table,
        resolver: NameResolver::new(schema, pluralizer),
        config,
    }
    .expand()
}

/// Per-table orchestrator: enumerates the table's relation sources in fixed
/// order, classifies each, and drives the matching producer.
struct Expand<'a> {
    schema: &'a Schema,
    table: &'a Table,
    resolver: NameResolver<'a>,
    config: &'a Config,
}

impl Expand<'_> {
    fn expand(&self) -> Result<RelationFragments> {
        self.check_identifier_collisions()?;

        let mut fragments = RelationFragments::default();

        for producer in self.producers()? {
            push_block(&mut fragments.attributes, producer.attributes(&mut fragments.imports));
            push_block(
                &mut fragments.scheduled_attributes,
                producer.scheduled_attribute(&mut fragments.imports),
            );
            push_block(&mut fragments.methods, producer.methods(&mut fragments.imports));
            push_lines(&mut fragments.on_reload, producer.on_reload());
            push_block(&mut fragments.save_code, producer.save_code(&mut fragments.imports));

            let clear = producer.clear_references();
            push_lines(&mut fragments.clear_references, clear.statements);
            fragments.cleared_attributes.extend(clear.attributes);

            for column in &self.table.columns {
                if let Some(reset) = producer.column_mutator_reset(column) {
                    push_lines(
                        fragments
                            .column_mutator_resets
                            .entry(column.name.snake_case())
                            .or_default(),
                        reset,
                    );
                }
            }
        }

        Ok(fragments)
    }

    fn producers(&self) -> Result<Vec<Box<dyn RelationCodeProducer + '_>>> {
        let mut producers: Vec<Box<dyn RelationCodeProducer + '_>> = vec![];

        for fk in &self.table.foreign_keys {
            producers.push(Box::new(ForeignKeyProducer::new(
                self.schema,
                &self.resolver,
                self.config,
                fk,
            )));
        }

        for id in &self.table.referrers {
            let fk = self.schema.foreign_key(*id);
            match classify_referrer(self.schema, fk) {
                ReferrerShape::OneToOne => producers.push(Box::new(OneToOneProducer::new(
                    self.schema,
                    &self.resolver,
                    self.config,
                    fk,
                ))),
                ReferrerShape::OneToMany => producers.push(Box::new(OneToManyProducer::new(
                    self.schema,
                    &self.resolver,
                    self.config,
                    fk,
                ))),
            }
        }

        for cross in &self.table.cross_relations {
            if cross.crossing.is_empty() {
                return Err(CodegenError::inconsistency(
                    &self.table.name.snake_case(),
                    format!(
                        "junction table `{}` has no crossing key to relate through",
                        self.schema.table(cross.middle).name.snake_case()
                    ),
                ));
            }

            match classify_cross(cross) {
                CrossShape::ManyToMany => producers.push(Box::new(ManyToManyProducer::new(
                    self.schema,
                    &self.resolver,
                    self.config,
                    self.table,
                    cross,
                )?)),
                CrossShape::Ternary => producers.push(Box::new(TernaryProducer::new(
                    self.schema,
                    &self.resolver,
                    self.config,
                    self.table,
                    cross,
                )?)),
            }
        }

        Ok(producers)
    }

    /// Relation identifiers must not collide with each other or with column
    /// names; the generated accessors share one method namespace.
    fn check_identifier_collisions(&self) -> Result<()> {
        let mut identifiers: Vec<String> = vec![];

        for fk in &self.table.foreign_keys {
            identifiers.push(self.resolver.identifier(fk, false, false));
        }
        for id in &self.table.referrers {
            let fk = self.schema.foreign_key(*id);
            identifiers.push(self.resolver.reversed_identifier(fk, false, false));
        }
        for cross in &self.table.cross_relations {
            let names = CrossRelationNames::new(self.schema, &self.resolver, cross);
            identifiers.push(names.target_identifier(false));
        }

        for (index, identifier) in identifiers.iter().enumerate() {
            if identifiers[..index].contains(identifier) {
                return Err(CodegenError::NamingCollision {
                    table: self.table.name.snake_case(),
                    identifier: identifier.clone(),
                });
            }

            if self
                .table
                .columns
                .iter()
                .any(|column| column.php_name() == *identifier)
            {
                return Err(CodegenError::inconsistency(
                    &self.table.name.snake_case(),
                    format!("relation identifier `{identifier}` collides with a column name"),
                ));
            }
        }

        Ok(())
    }
}

/// Appends a fragment, separating blocks with a blank line.
fn push_block(out: &mut String, block: String) {
    if block.is_empty() {
        return;
    }
    if !out.is_empty() {
        out.push('\n');
    }
    out.push_str(&block);
}

/// Appends statement lines without a separating blank line.
fn push_lines(out: &mut String, lines: String) {
    if lines.is_empty() {
        return;
    }
    out.push_str(&lines);
}

/// Position of a junction-table local column within the junction's declared
/// primary key. Staged-deletion code reconstructs composite keys by these
/// positions, not by participant enumeration order.
pub(crate) fn middle_pk_position(
    schema: &Schema,
    middle: &Table,
    local: ColumnId,
    owner: &Table,
) -> Result<usize> {
    middle.primary_key_position(local).ok_or_else(|| {
        CodegenError::inconsistency(
            &owner.name.snake_case(),
            format!(
                "column `{}` of junction table `{}` is not part of its primary key",
                schema.column(local).name.snake_case(),
                middle.name.snake_case()
            ),
        )
    })
}

/// Registers the model class for `table` and returns its short name.
pub(crate) fn model_class(imports: &mut ImportRegistry, config: &Config, table: &Table) -> String {
    imports.register(&format!("{}\\{}", config.model_namespace, table.php_name()))
}

/// Registers the query class for `table` and returns its short name.
pub(crate) fn query_class(imports: &mut ImportRegistry, config: &Config, table: &Table) -> String {
    imports.register(&format!(
        "{}\\{}Query",
        config.model_namespace,
        table.php_name()
    ))
}

pub(crate) fn object_collection_class(imports: &mut ImportRegistry, config: &Config) -> String {
    imports.register(&format!(
        "{}\\Collection\\ObjectCollection",
        config.runtime_namespace
    ))
}

pub(crate) fn combination_collection_class(
    imports: &mut ImportRegistry,
    config: &Config,
) -> String {
    imports.register(&format!(
        "{}\\Collection\\ObjectCombinationCollection",
        config.runtime_namespace
    ))
}

pub(crate) fn collection_interface(imports: &mut ImportRegistry, config: &Config) -> String {
    imports.register(&format!("{}\\Collection\\Collection", config.runtime_namespace))
}

pub(crate) fn criteria_class(imports: &mut ImportRegistry, config: &Config) -> String {
    imports.register(&format!("{}\\ActiveQuery\\Criteria", config.runtime_namespace))
}

pub(crate) fn connection_interface(imports: &mut ImportRegistry, config: &Config) -> String {
    imports.register(&format!(
        "{}\\Connection\\ConnectionInterface",
        config.runtime_namespace
    ))
}
