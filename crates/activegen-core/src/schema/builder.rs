use super::{
    Column, ColumnId, ColumnType, CrossRelation, ForeignKey, ForeignKeyId, MappedColumn, Name,
    OnDelete, Schema, Table, TableId,
};
use crate::Result;

use anyhow::bail;
use indexmap::IndexMap;

/// Programmatic schema construction.
///
/// Tables, columns, and foreign keys are declared by name; the build step
/// resolves references, derives referrer lists and cross relations, computes
/// the table-pair index, and verifies the result.
#[derive(Default)]
pub struct SchemaBuilder {
    tables: Vec<TableDraft>,
}

pub struct TableDraft {
    name: String,
    columns: Vec<ColumnDraft>,
    foreign_keys: Vec<ForeignKeyDraft>,
    is_cross_ref: bool,
    is_read_only: bool,
}

pub struct ColumnDraft {
    name: String,
    ty: ColumnType,
    nullable: bool,
    default: Option<String>,
    primary_key: bool,
    auto_increment: bool,
    plural_name: bool,
}

pub struct ForeignKeyDraft {
    name: Option<String>,
    target: String,
    pairs: Vec<(String, MappedDraft)>,
    on_delete: OnDelete,
}

enum MappedDraft {
    Column(String),
    Literal(String),
}

impl SchemaBuilder {
    pub fn table(&mut self, name: &str) -> &mut TableDraft {
        self.tables.push(TableDraft {
            name: name.to_string(),
            columns: vec![],
            foreign_keys: vec![],
            is_cross_ref: false,
            is_read_only: false,
        });
        self.tables.last_mut().unwrap()
    }

    pub fn build(self) -> Result<Schema> {
        let mut tables = IndexMap::new();

        // First pass: materialize tables and columns so foreign keys can be
        // resolved against any table regardless of declaration order.
        for (index, draft) in self.tables.iter().enumerate() {
            let id = TableId(index);
            let mut columns = vec![];
            let mut primary_key = vec![];

            for (column_index, column) in draft.columns.iter().enumerate() {
                let column_id = ColumnId {
                    table: id,
                    index: column_index,
                };

                if column.primary_key {
                    primary_key.push(column_id);
                }

                columns.push(Column {
                    id: column_id,
                    name: Name::new(&column.name),
                    ty: column.ty,
                    nullable: column.nullable && !column.primary_key,
                    default: column.default.clone(),
                    primary_key: column.primary_key,
                    auto_increment: column.auto_increment,
                    plural_name: column.plural_name,
                });
            }

            tables.insert(
                id,
                Table {
                    id,
                    name: Name::new(&draft.name),
                    columns,
                    primary_key,
                    foreign_keys: vec![],
                    referrers: vec![],
                    cross_relations: vec![],
                    is_cross_ref: draft.is_cross_ref,
                    is_read_only: draft.is_read_only,
                },
            );
        }

        let ids_by_name: IndexMap<String, TableId> = tables
            .values()
            .map(|table| (table.name.snake_case(), table.id))
            .collect();

        if ids_by_name.len() != tables.len() {
            bail!("duplicate table name in schema");
        }

        // Second pass: resolve foreign keys.
        for (index, draft) in self.tables.iter().enumerate() {
            let id = TableId(index);

            for fk_draft in &draft.foreign_keys {
                let Some(&target) = ids_by_name.get(&Name::new(&fk_draft.target).snake_case())
                else {
                    bail!(
                        "foreign key on `{}` references unknown table `{}`",
                        draft.name,
                        fk_draft.target
                    );
                };

                let mut columns = vec![];

                for (local, foreign) in &fk_draft.pairs {
                    let local = resolve_column(&tables[&id], local)?;
                    let foreign = match foreign {
                        MappedDraft::Column(name) => {
                            MappedColumn::Column(resolve_column(&tables[&target], name)?)
                        }
                        MappedDraft::Literal(value) => MappedColumn::Literal(value.clone()),
                    };
                    columns.push(super::ColumnPair { local, foreign });
                }

                let fk_id = ForeignKeyId {
                    table: id,
                    index: tables[&id].foreign_keys.len(),
                };

                tables.get_mut(&id).unwrap().foreign_keys.push(ForeignKey {
                    id: fk_id,
                    name: fk_draft.name.clone(),
                    target,
                    columns,
                    on_delete: fk_draft.on_delete,
                });
            }
        }

        // Link referrers.
        let mut referrers: Vec<(TableId, ForeignKeyId)> = vec![];
        for table in tables.values() {
            for fk in &table.foreign_keys {
                referrers.push((fk.target, fk.id));
            }
        }
        for (target, fk) in referrers {
            tables.get_mut(&target).unwrap().referrers.push(fk);
        }

        // Derive cross relations from junction tables: every incoming key of
        // a junction table becomes a cross relation on the referenced table,
        // carrying the junction's other keys and any leftover primary key
        // columns.
        let mut cross_relations: Vec<(TableId, CrossRelation)> = vec![];
        for middle in tables.values().filter(|table| table.is_cross_ref) {
            let covered: Vec<ColumnId> = middle
                .foreign_keys
                .iter()
                .flat_map(|fk| fk.local_columns())
                .collect();

            let unclassified: Vec<ColumnId> = middle
                .primary_key
                .iter()
                .copied()
                .filter(|pk| !covered.contains(pk))
                .collect();

            for incoming in &middle.foreign_keys {
                let crossing: Vec<ForeignKeyId> = middle
                    .foreign_keys
                    .iter()
                    .filter(|fk| fk.id != incoming.id)
                    .map(|fk| fk.id)
                    .collect();

                if crossing.is_empty() && unclassified.is_empty() {
                    bail!(
                        "junction table `{}` needs at least two foreign keys",
                        middle.name.snake_case()
                    );
                }

                cross_relations.push((
                    incoming.target,
                    CrossRelation {
                        middle: middle.id,
                        incoming: incoming.id,
                        crossing,
                        unclassified_primary_keys: unclassified.clone(),
                    },
                ));
            }
        }
        for (owner, cross) in cross_relations {
            tables.get_mut(&owner).unwrap().cross_relations.push(cross);
        }

        // Pair index for RelatedBy disambiguation.
        let mut pair_index: IndexMap<(TableId, TableId), Vec<ForeignKeyId>> = IndexMap::new();
        for table in tables.values() {
            for fk in &table.foreign_keys {
                pair_index
                    .entry((fk.source(), fk.target))
                    .or_default()
                    .push(fk.id);
            }
        }

        let schema = Schema { tables, pair_index };
        schema.verify()?;

        Ok(schema)
    }
}

fn resolve_column(table: &Table, name: &str) -> Result<ColumnId> {
    match table.column_by_name(&Name::new(name).snake_case()) {
        Some(column) => Ok(column.id),
        None => bail!(
            "unknown column `{}` on table `{}`",
            name,
            table.name.snake_case()
        ),
    }
}

impl TableDraft {
    pub fn column(&mut self, name: &str, ty: ColumnType) -> &mut ColumnDraft {
        self.columns.push(ColumnDraft {
            name: name.to_string(),
            ty,
            nullable: true,
            default: None,
            primary_key: false,
            auto_increment: false,
            plural_name: false,
        });
        self.columns.last_mut().unwrap()
    }

    pub fn foreign_key(&mut self, target: &str) -> &mut ForeignKeyDraft {
        self.foreign_keys.push(ForeignKeyDraft {
            name: None,
            target: target.to_string(),
            pairs: vec![],
            on_delete: OnDelete::default(),
        });
        self.foreign_keys.last_mut().unwrap()
    }

    pub fn cross_ref(&mut self) -> &mut Self {
        self.is_cross_ref = true;
        self
    }

    pub fn read_only(&mut self) -> &mut Self {
        self.is_read_only = true;
        self
    }
}

impl ColumnDraft {
    pub fn primary_key(&mut self) -> &mut Self {
        self.primary_key = true;
        self
    }

    pub fn required(&mut self) -> &mut Self {
        self.nullable = false;
        self
    }

    pub fn auto_increment(&mut self) -> &mut Self {
        self.auto_increment = true;
        self
    }

    pub fn default_value(&mut self, value: &str) -> &mut Self {
        self.default = Some(value.to_string());
        self
    }

    pub fn plural_name(&mut self) -> &mut Self {
        self.plural_name = true;
        self
    }
}

impl ForeignKeyDraft {
    /// Map a local column to a column on the target table.
    pub fn pair(&mut self, local: &str, foreign: &str) -> &mut Self {
        self.pairs
            .push((local.to_string(), MappedDraft::Column(foreign.to_string())));
        self
    }

    /// Pin a local column to a constant value.
    pub fn literal_pair(&mut self, local: &str, value: &str) -> &mut Self {
        self.pairs
            .push((local.to_string(), MappedDraft::Literal(value.to_string())));
        self
    }

    pub fn on_delete(&mut self, policy: OnDelete) -> &mut Self {
        self.on_delete = policy;
        self
    }

    /// Explicit relation name, overriding derived naming.
    pub fn named(&mut self, name: &str) -> &mut Self {
        self.name = Some(name.to_string());
        self
    }
}
