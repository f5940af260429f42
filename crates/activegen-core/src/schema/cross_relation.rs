use super::{ColumnId, ForeignKeyId, TableId};

/// A many-to-many (or N-ary) relation routed through a junction table.
///
/// Attributed to the table the `incoming` key references; `crossing` holds
/// the junction table's other outgoing keys in declaration order, and
/// `unclassified_primary_keys` the junction-table primary key columns not
/// covered by any key (extra discriminator columns such as a day/type pair).
#[derive(Debug, Clone)]
pub struct CrossRelation {
    /// The junction table.
    pub middle: TableId,

    /// The key from the junction table into the table owning this relation.
    pub incoming: ForeignKeyId,

    /// The junction table's other outgoing keys, in declaration order.
    pub crossing: Vec<ForeignKeyId>,

    /// Junction-table primary key columns not covered by any foreign key,
    /// in declaration order.
    pub unclassified_primary_keys: Vec<ColumnId>,
}

impl CrossRelation {
    /// True when the relation spans more than one target model or carries
    /// discriminator columns. Selects the ternary generation strategy over
    /// plain many-to-many.
    pub fn is_multi_model(&self) -> bool {
        self.crossing.len() > 1 || !self.unclassified_primary_keys.is_empty()
    }
}
