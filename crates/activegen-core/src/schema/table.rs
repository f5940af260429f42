use super::{Column, ColumnId, CrossRelation, ForeignKey, ForeignKeyId, Name};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableId(pub usize);

#[derive(Debug, Clone)]
pub struct Table {
    /// Uniquely identifies the table within the schema
    pub id: TableId,

    /// Name of the table
    pub name: Name,

    /// Columns in declaration order
    pub columns: Vec<Column>,

    /// Primary key columns in declared order. Primary-key index
    /// reconstruction for staged deletions depends on this ordering.
    pub primary_key: Vec<ColumnId>,

    /// Outgoing foreign keys in declaration order
    pub foreign_keys: Vec<ForeignKey>,

    /// Incoming foreign keys, resolved when the schema is built
    pub referrers: Vec<ForeignKeyId>,

    /// Cross relations this table owns the collection side of, resolved when
    /// the schema is built
    pub cross_relations: Vec<CrossRelation>,

    /// Marks a junction table whose incoming keys become cross relations on
    /// the referenced tables
    pub is_cross_ref: bool,

    /// Read-only tables get no mutators or persistence relations
    pub is_read_only: bool,
}

impl Table {
    /// Identifier used for the table's generated class.
    pub fn php_name(&self) -> String {
        self.name.upper_camel_case()
    }

    pub fn column(&self, id: ColumnId) -> &Column {
        assert_eq!(self.id, id.table);
        self.columns.get(id.index).expect("invalid column ID")
    }

    pub fn column_by_name(&self, name: &str) -> Option<&Column> {
        self.columns
            .iter()
            .find(|column| column.name.snake_case() == name)
    }

    pub fn primary_key_columns(&self) -> impl Iterator<Item = &Column> {
        self.primary_key.iter().map(|id| self.column(*id))
    }

    /// Position of `id` within the declared primary key, if it is part of it.
    pub fn primary_key_position(&self, id: ColumnId) -> Option<usize> {
        self.primary_key.iter().position(|pk| *pk == id)
    }
}
