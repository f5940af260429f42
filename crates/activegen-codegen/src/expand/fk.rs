use super::{
    connection_interface, model_class, query_class, ClearReferences, Config, RelationCodeProducer,
};
use crate::imports::ImportRegistry;
use crate::names::NameResolver;
use crate::php;

use activegen_core::schema::{Column, ForeignKey, MappedColumn, Schema, Table};

use std::fmt::Write;

/// Emits the owning side of an outgoing foreign key: a single cached
/// reference, its accessor/mutator pair, and the save-time cascade that
/// persists the referenced object before this one.
pub(super) struct ForeignKeyProducer<'a> {
    schema: &'a Schema,
    resolver: &'a NameResolver<'a>,
    config: &'a Config,
    fk: &'a ForeignKey,
}

impl<'a> ForeignKeyProducer<'a> {
    pub(super) fn new(
        schema: &'a Schema,
        resolver: &'a NameResolver<'a>,
        config: &'a Config,
        fk: &'a ForeignKey,
    ) -> Self {
        Self {
            schema,
            resolver,
            config,
            fk,
        }
    }

    fn name(&self) -> String {
        self.resolver.identifier(self.fk, false, false)
    }

    fn attribute(&self) -> String {
        format!("a{}", self.name())
    }

    fn target(&self) -> &'a Table {
        self.fk.target_table(self.schema)
    }

    fn is_one_to_one(&self) -> bool {
        self.fk.is_local_primary_key(self.schema)
    }

    /// Assignments run by the mutator, one per column pair. Clearing the
    /// relation replays each local column's default.
    fn mutator_assignments(&self) -> (String, String) {
        let mut on_null = String::new();
        let mut on_value = String::new();

        for pair in &self.fk.columns {
            let local = self.schema.column(pair.local);
            let setter = format!("set{}", local.php_name());

            let _ = writeln!(on_null, "    $this->{setter}({});", php::cleared_value(local));

            match &pair.foreign {
                MappedColumn::Column(id) => {
                    let foreign = self.schema.column(*id);
                    let _ = writeln!(on_value, "    $this->{setter}($v->get{}());", foreign.php_name());
                }
                MappedColumn::Literal(value) => {
                    let literal = php::column_literal(local, value);
                    let _ = writeln!(on_value, "    $this->{setter}({literal});");
                }
            }
        }

        (on_null, on_value)
    }

    /// Lazy-load guard: only resolve when every local column holds a
    /// non-default value. Numeric columns compare against zero, text columns
    /// against null/empty, everything else against null.
    fn accessor_guard(&self) -> String {
        let mut terms = vec![];

        for pair in &self.fk.columns {
            let local = self.schema.column(pair.local);
            let attribute = local.attribute_name();

            if !matches!(pair.foreign, MappedColumn::Column(_)) {
                continue;
            }

            let term = if local.ty.is_numeric() {
                format!("$this->{attribute} != 0")
            } else if local.ty.is_text() {
                format!("$this->{attribute} !== null && $this->{attribute} !== ''")
            } else {
                format!("$this->{attribute} !== null")
            };
            terms.push(term);
        }

        terms.join(" && ")
    }

    /// The lookup expression resolving the related object. A key covering the
    /// target's full primary key resolves by primary key, reusing an
    /// identity-mapped instance when the runtime holds one; anything else
    /// issues a filtered query.
    fn lookup(&self, imports: &mut ImportRegistry) -> String {
        let query = query_class(imports, self.config, self.target());

        if self.fk.is_foreign_primary_key(self.schema) {
            let mut locals = vec![];
            for pk in self.target().primary_key_columns() {
                for pair in &self.fk.columns {
                    if let MappedColumn::Column(id) = pair.foreign {
                        if id == pk.id {
                            locals.push(format!(
                                "$this->{}",
                                self.schema.column(pair.local).attribute_name()
                            ));
                        }
                    }
                }
            }

            let key = if locals.len() == 1 {
                locals.remove(0)
            } else {
                format!("[{}]", locals.join(", "))
            };

            format!("{query}::create()->findPk({key}, $con)")
        } else {
            let reverse = self.resolver.reversed_identifier(self.fk, false, false);
            format!("{query}::create()->filterBy{reverse}($this)->findOne($con)")
        }
    }

    fn mutator(&self, imports: &mut ImportRegistry) -> String {
        let name = self.name();
        let attribute = self.attribute();
        let class = model_class(imports, self.config, self.target());
        let (on_null, on_value) = self.mutator_assignments();

        let reverse_link = if self.is_one_to_one() {
            let reverse = self.resolver.reversed_identifier(self.fk, false, false);
            format!(
                "    // Add binding for other direction of this 1:1 relationship.\n    if ($v !== null) {{\n        $v->set{reverse}($this);\n    }}\n"
            )
        } else {
            let reverse = self.resolver.reversed_identifier(self.fk, false, false);
            format!(
                "    // Add binding for other direction of this n:n relationship.\n    if ($v !== null) {{\n        $v->add{reverse}($this);\n    }}\n"
            )
        };

        format!(
            "/**\n * Declares an association between this object and a {class} object.\n *\n * @param {class}|null $v\n * @return $this The current object (for fluent API support)\n */\npublic function set{name}(?{class} $v = null)\n{{\n    if ($v === null) {{\n{on_null}    }} else {{\n{on_value}    }}\n\n    $this->{attribute} = $v;\n\n{reverse_link}\n    return $this;\n}}\n"
        )
    }

    fn accessor(&self, imports: &mut ImportRegistry) -> String {
        let name = self.name();
        let attribute = self.attribute();
        let class = model_class(imports, self.config, self.target());
        let connection = connection_interface(imports, self.config);
        let guard = self.accessor_guard();
        let lookup = self.lookup(imports);

        let linking = if self.is_one_to_one() {
            let reverse = self.resolver.reversed_identifier(self.fk, false, false);
            format!(
                "        if ($this->{attribute} !== null) {{\n            // Bind the other direction of this 1:1 relationship.\n            $this->{attribute}->set{reverse}($this);\n        }}\n"
            )
        } else {
            let reverse_plural = self.resolver.reversed_identifier(self.fk, true, false);
            format!(
                "        /* The following can be used additionally to\n            guarantee the related object contains a reference\n            to this object.  This level of coupling may, however, be\n            undesirable since it could result in an only partially populated collection\n            in the referenced object.\n            $this->{attribute}->add{reverse_plural}($this);\n         */\n"
            )
        };

        format!(
            "/**\n * Get the associated {class} object\n *\n * @param {connection}|null $con Optional Connection object.\n * @param bool $doQuery Whether a database query may run to resolve the object.\n * @return {class}|null The associated {class} object.\n */\npublic function get{name}(?{connection} $con = null, bool $doQuery = true)\n{{\n    if ($this->{attribute} === null && $doQuery && ({guard})) {{\n        $this->{attribute} = {lookup};\n{linking}    }}\n\n    return $this->{attribute};\n}}\n"
        )
    }
}

impl RelationCodeProducer for ForeignKeyProducer<'_> {
    fn attributes(&self, imports: &mut ImportRegistry) -> String {
        let class = model_class(imports, self.config, self.target());
        format!(
            "/**\n * @var {class}|null\n */\nprotected ${};\n",
            self.attribute()
        )
    }

    fn methods(&self, imports: &mut ImportRegistry) -> String {
        let mut out = self.mutator(imports);
        out.push('\n');
        out.push_str(&self.accessor(imports));
        out
    }

    fn on_reload(&self) -> String {
        format!("$this->{} = null;\n", self.attribute())
    }

    fn clear_references(&self) -> ClearReferences {
        ClearReferences {
            statements: String::new(),
            attributes: vec![self.attribute()],
        }
    }

    fn save_code(&self, _imports: &mut ImportRegistry) -> String {
        let name = self.name();
        let attribute = self.attribute();

        format!(
            "// A referenced object must be persisted first so this row can\n// carry its key values.\nif ($this->{attribute} !== null) {{\n    if ($this->{attribute}->isModified() || $this->{attribute}->isNew()) {{\n        $affectedRows += $this->{attribute}->save($con);\n    }}\n    $this->set{name}($this->{attribute});\n}}\n"
        )
    }

    fn column_mutator_reset(&self, column: &Column) -> Option<String> {
        let mapped = self.fk.mapped_column(column.id)?;
        let MappedColumn::Column(foreign) = mapped else {
            return None;
        };

        let attribute = self.attribute();
        let getter = format!("get{}", self.schema.column(*foreign).php_name());

        Some(format!(
            "if ($this->{attribute} !== null && $this->{attribute}->{getter}() !== $v) {{\n    $this->{attribute} = null;\n}}\n"
        ))
    }
}
