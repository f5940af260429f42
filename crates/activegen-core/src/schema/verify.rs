use super::{MappedColumn, Schema};
use crate::Result;

use anyhow::bail;

struct Verify<'a> {
    schema: &'a Schema,
}

impl Schema {
    pub(super) fn verify(&self) -> Result<()> {
        Verify { schema: self }.verify()
    }
}

impl Verify<'_> {
    fn verify(&self) -> Result<()> {
        debug_assert!(self.verify_ids_populated());

        self.verify_foreign_key_mappings()?;
        self.verify_no_bidirectional_one_to_one()?;
        self.verify_explicit_names_are_unique()?;
        Ok(())
    }

    fn verify_ids_populated(&self) -> bool {
        for table in self.schema.tables() {
            for (index, column) in table.columns.iter().enumerate() {
                assert_eq!(column.id.table, table.id);
                assert_eq!(column.id.index, index);
            }

            for (index, fk) in table.foreign_keys.iter().enumerate() {
                assert_eq!(fk.id.table, table.id);
                assert_eq!(fk.id.index, index);
            }

            for cross in &table.cross_relations {
                assert_eq!(
                    self.schema.foreign_key(cross.incoming).target,
                    table.id,
                    "cross relation attributed to the wrong table"
                );
            }
        }

        true
    }

    /// Every key must carry at least one pair, and every foreign column must
    /// belong to the referenced table.
    fn verify_foreign_key_mappings(&self) -> Result<()> {
        for table in self.schema.tables() {
            for fk in &table.foreign_keys {
                if fk.columns.is_empty() {
                    bail!(
                        "foreign key on `{}` has an empty column mapping",
                        table.name.snake_case()
                    );
                }

                if fk.foreign_columns().next().is_none() {
                    bail!(
                        "foreign key on `{}` maps no column of `{}`",
                        table.name.snake_case(),
                        fk.target_table(self.schema).name.snake_case()
                    );
                }

                for pair in &fk.columns {
                    if let MappedColumn::Column(id) = pair.foreign {
                        if id.table != fk.target {
                            bail!(
                                "foreign key on `{}` maps to a column outside `{}`",
                                table.name.snake_case(),
                                fk.target_table(self.schema).name.snake_case()
                            );
                        }
                    }
                }
            }
        }

        Ok(())
    }

    /// A 1:1 relation declared from both sides has no owner; generation
    /// cannot pick which side holds the reference.
    fn verify_no_bidirectional_one_to_one(&self) -> Result<()> {
        for table in self.schema.tables() {
            for fk in &table.foreign_keys {
                if !fk.is_local_primary_key(self.schema) {
                    continue;
                }

                let reverse = self
                    .schema
                    .foreign_keys_between(fk.target, fk.source())
                    .iter()
                    .map(|id| self.schema.foreign_key(*id))
                    .any(|other| other.is_local_primary_key(self.schema));

                if reverse {
                    bail!(
                        "one-to-one relation between `{}` and `{}` is declared in both \
                         directions; declare the key on one side only",
                        table.name.snake_case(),
                        fk.target_table(self.schema).name.snake_case()
                    );
                }
            }
        }

        Ok(())
    }

    fn verify_explicit_names_are_unique(&self) -> Result<()> {
        for table in self.schema.tables() {
            for (index, fk) in table.foreign_keys.iter().enumerate() {
                let Some(name) = &fk.name else { continue };

                let duplicate = table.foreign_keys[..index]
                    .iter()
                    .any(|other| other.name.as_deref() == Some(name));

                if duplicate {
                    bail!(
                        "duplicate relation name `{name}` on table `{}`",
                        table.name.snake_case()
                    );
                }
            }
        }

        Ok(())
    }
}
