use super::{
    connection_interface, model_class, query_class, ClearReferences, Config, RelationCodeProducer,
};
use crate::imports::ImportRegistry;
use crate::names::NameResolver;

use activegen_core::schema::{ForeignKey, Schema, Table};

/// Emits the referenced side of a one-to-one relation: a single cached
/// reference resolved through this object's own primary key. No collection
/// and no deletion staging; cardinality is at most one by construction.
pub(super) struct OneToOneProducer<'a> {
    schema: &'a Schema,
    resolver: &'a NameResolver<'a>,
    config: &'a Config,
    fk: &'a ForeignKey,
}

impl<'a> OneToOneProducer<'a> {
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
        self.resolver.reversed_identifier(self.fk, false, false)
    }

    fn attribute(&self) -> String {
        format!("single{}", self.name())
    }

    /// The table declaring the key, i.e. the related class.
    fn source(&self) -> &'a Table {
        self.fk.source_table(self.schema)
    }

    fn forward_name(&self) -> String {
        self.resolver.identifier(self.fk, false, false)
    }

    fn accessor(&self, imports: &mut ImportRegistry) -> String {
        let name = self.name();
        let attribute = self.attribute();
        let class = model_class(imports, self.config, self.source());
        let query = query_class(imports, self.config, self.source());
        let connection = connection_interface(imports, self.config);

        format!(
            "/**\n * Gets a single {class} object, which is related to this object by a one-to-one relationship.\n *\n * @param {connection}|null $con optional connection object\n * @return {class}|null\n */\npublic function get{name}(?{connection} $con = null)\n{{\n    if ($this->{attribute} === null && !$this->isNew()) {{\n        $this->{attribute} = {query}::create()->findPk($this->getPrimaryKey(), $con);\n    }}\n\n    return $this->{attribute};\n}}\n"
        )
    }

    fn mutator(&self, imports: &mut ImportRegistry) -> String {
        let name = self.name();
        let attribute = self.attribute();
        let class = model_class(imports, self.config, self.source());
        let forward = self.forward_name();

        format!(
            "/**\n * Sets a single {class} object as related to this object by a one-to-one relationship.\n *\n * @param {class}|null $v\n * @return $this The current object (for fluent API support)\n */\npublic function set{name}(?{class} $v = null)\n{{\n    $this->{attribute} = $v;\n\n    // Link the passed object back to this one, unless it already points\n    // somewhere. Setting only the unset side avoids mutual recursion.\n    if ($v !== null && $v->get{forward}(null, false) === null) {{\n        $v->set{forward}($this);\n    }}\n\n    return $this;\n}}\n"
        )
    }
}

impl RelationCodeProducer for OneToOneProducer<'_> {
    fn attributes(&self, imports: &mut ImportRegistry) -> String {
        let class = model_class(imports, self.config, self.source());
        format!(
            "/**\n * @var {class}|null\n */\nprotected ${};\n",
            self.attribute()
        )
    }

    fn methods(&self, imports: &mut ImportRegistry) -> String {
        let mut out = self.accessor(imports);
        out.push('\n');
        out.push_str(&self.mutator(imports));
        out
    }

    fn on_reload(&self) -> String {
        format!("$this->{} = null;\n", self.attribute())
    }

    fn clear_references(&self) -> ClearReferences {
        let attribute = self.attribute();
        ClearReferences {
            statements: format!(
                "if ($this->{attribute}) {{\n    $this->{attribute}->clearAllReferences($deep);\n}}\n"
            ),
            attributes: vec![attribute],
        }
    }

    fn save_code(&self, _imports: &mut ImportRegistry) -> String {
        let attribute = self.attribute();
        format!(
            "if ($this->{attribute} !== null) {{\n    if (!$this->{attribute}->isDeleted() && ($this->{attribute}->isNew() || $this->{attribute}->isModified())) {{\n        $affectedRows += $this->{attribute}->save($con);\n    }}\n}}\n"
        )
    }
}
