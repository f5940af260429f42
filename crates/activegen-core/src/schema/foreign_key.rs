use super::{Column, ColumnId, Schema, Table, TableId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ForeignKeyId {
    /// The table declaring the key.
    pub table: TableId,

    /// Position within the declaring table's foreign key list.
    pub index: usize,
}

/// What a local column maps to on the foreign side.
#[derive(Debug, Clone)]
pub enum MappedColumn {
    /// The usual case: a column on the target table.
    Column(ColumnId),

    /// A constant the local column is pinned to.
    Literal(String),
}

/// One local/foreign pairing of a foreign key, in declaration order.
#[derive(Debug, Clone)]
pub struct ColumnPair {
    pub local: ColumnId,
    pub foreign: MappedColumn,
}

/// Row-deletion policy declared on the key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OnDelete {
    #[default]
    None,
    Cascade,
    SetNull,
    Restrict,
}

#[derive(Debug, Clone)]
pub struct ForeignKey {
    /// Uniquely identifies the key within the schema
    pub id: ForeignKeyId,

    /// Explicit relation name override. Suppresses the derived identifier
    /// (including `RelatedBy` disambiguation) when present.
    pub name: Option<String>,

    /// The referenced table
    pub target: TableId,

    /// Ordered local-to-foreign column mapping
    pub columns: Vec<ColumnPair>,

    pub on_delete: OnDelete,
}

impl ForeignKey {
    /// The table declaring the key.
    pub fn source(&self) -> TableId {
        self.id.table
    }

    pub fn source_table<'a>(&self, schema: &'a Schema) -> &'a Table {
        schema.table(self.id.table)
    }

    pub fn target_table<'a>(&self, schema: &'a Schema) -> &'a Table {
        schema.table(self.target)
    }

    /// Local columns of the mapping, in declaration order.
    pub fn local_columns(&self) -> impl Iterator<Item = ColumnId> + '_ {
        self.columns.iter().map(|pair| pair.local)
    }

    /// Foreign columns of the mapping, skipping literal-pinned pairs.
    pub fn foreign_columns(&self) -> impl Iterator<Item = ColumnId> + '_ {
        self.columns.iter().filter_map(|pair| match pair.foreign {
            MappedColumn::Column(id) => Some(id),
            MappedColumn::Literal(_) => None,
        })
    }

    /// The foreign side paired with `local`, if `local` belongs to the key.
    pub fn mapped_column(&self, local: ColumnId) -> Option<&MappedColumn> {
        self.columns
            .iter()
            .find(|pair| pair.local == local)
            .map(|pair| &pair.foreign)
    }

    pub fn is_composite(&self) -> bool {
        self.columns.len() > 1
    }

    /// True when the local columns are exactly the declaring table's full
    /// primary key. Seen from the referenced table, such a key is a
    /// one-to-one relation: the declaring side cannot hold two rows for the
    /// same target row.
    pub fn is_local_primary_key(&self, schema: &Schema) -> bool {
        let table = self.source_table(schema);
        let locals: Vec<ColumnId> = self.local_columns().collect();

        !locals.is_empty()
            && locals.len() == table.primary_key.len()
            && table.primary_key.iter().all(|pk| locals.contains(pk))
    }

    /// True when the foreign columns are exactly the target's full primary
    /// key, enabling primary-key lookup instead of a filtered query.
    pub fn is_foreign_primary_key(&self, schema: &Schema) -> bool {
        let target = self.target_table(schema);
        let foreigns: Vec<ColumnId> = self.foreign_columns().collect();

        !foreigns.is_empty()
            && foreigns.len() == target.primary_key.len()
            && target.primary_key.iter().all(|pk| foreigns.contains(pk))
    }

    /// True when at least one local column rejects NULL, making the relation
    /// required from the declaring side.
    pub fn is_required(&self, schema: &Schema) -> bool {
        self.local_columns()
            .any(|id| schema.column(id).is_required())
    }

    pub fn local_column<'a>(&self, schema: &'a Schema, index: usize) -> &'a Column {
        schema.column(self.columns[index].local)
    }

    pub fn on_delete_cascade(&self) -> bool {
        self.on_delete == OnDelete::Cascade
    }
}
