use super::{ColumnType, Name, TableId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColumnId {
    /// The table containing the column.
    pub table: TableId,

    /// Position within the table's column list.
    pub index: usize,
}

#[derive(Debug, Clone)]
pub struct Column {
    /// Uniquely identifies the column within the schema
    pub id: ColumnId,

    /// Name of the column as declared in the schema
    pub name: Name,

    /// Scalar type
    pub ty: ColumnType,

    /// True if the column accepts NULL
    pub nullable: bool,

    /// Default value literal as declared in the schema, if any
    pub default: Option<String>,

    /// True if the column is part of the primary key
    pub primary_key: bool,

    /// True if the column value is assigned by the database on insert
    pub auto_increment: bool,

    /// True when the column name is already plural; array columns with a
    /// plural name get singular add/remove helpers outside this crate.
    pub plural_name: bool,
}

impl Column {
    /// Identifier used for the column in generated method names.
    pub fn php_name(&self) -> String {
        self.name.upper_camel_case()
    }

    /// Identifier of the generated object attribute backing the column.
    pub fn attribute_name(&self) -> String {
        self.name.snake_case()
    }

    pub fn is_required(&self) -> bool {
        !self.nullable
    }
}
