mod builder;
pub use builder::SchemaBuilder;

mod column;
pub use column::{Column, ColumnId};

mod cross_relation;
pub use cross_relation::CrossRelation;

mod foreign_key;
pub use foreign_key::{ColumnPair, ForeignKey, ForeignKeyId, MappedColumn, OnDelete};

mod name;
pub use name::Name;

mod table;
pub use table::{Table, TableId};

mod ty;
pub use ty::ColumnType;

mod verify;

use indexmap::IndexMap;

/// The relational schema graph consumed by the generator.
///
/// Constructed once through [`SchemaBuilder`] and immutable afterwards. All
/// collections are insertion-ordered; identifier resolution and primary-key
/// index reconstruction depend on declaration order being stable.
#[derive(Debug, Default)]
pub struct Schema {
    /// Tables in declaration order.
    pub(crate) tables: IndexMap<TableId, Table>,

    /// Every foreign key connecting an ordered (source, target) table pair,
    /// in declaration order. Precomputed so `RelatedBy` disambiguation is a
    /// lookup rather than a scan per resolved identifier.
    pub(crate) pair_index: IndexMap<(TableId, TableId), Vec<ForeignKeyId>>,
}

impl Schema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// Get a table by ID
    pub fn table(&self, id: impl Into<TableId>) -> &Table {
        self.tables.get(&id.into()).expect("invalid table ID")
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.values()
    }

    pub fn table_by_name(&self, name: &str) -> Option<&Table> {
        self.tables
            .values()
            .find(|table| table.name.snake_case() == name)
    }

    /// Get a column by ID
    pub fn column(&self, id: ColumnId) -> &Column {
        self.table(id.table).column(id)
    }

    /// Get a foreign key by ID
    pub fn foreign_key(&self, id: ForeignKeyId) -> &ForeignKey {
        self.table(id.table)
            .foreign_keys
            .get(id.index)
            .expect("invalid foreign key ID")
    }

    /// All foreign keys declared by `source` that reference `target`, in
    /// declaration order.
    pub fn foreign_keys_between(&self, source: TableId, target: TableId) -> &[ForeignKeyId] {
        self.pair_index
            .get(&(source, target))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}
