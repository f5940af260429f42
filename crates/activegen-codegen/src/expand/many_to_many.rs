use super::{
    collection_interface, connection_interface, criteria_class, middle_pk_position, model_class,
    object_collection_class, query_class, ClearReferences, Config, RelationCodeProducer,
};
use crate::cross::CrossRelationNames;
use crate::error::Result;
use crate::imports::ImportRegistry;
use crate::names::NameResolver;
use crate::php::{self, lower_first};

use activegen_core::schema::{
    CrossRelation, ForeignKey, MappedColumn, Schema, Table,
};

use std::fmt::Write;

/// Emits a classic many-to-many relation crossed through a junction table:
/// a collection of the far-side objects whose membership rows are created and
/// deleted implicitly as the collection is mutated.
pub(super) struct ManyToManyProducer<'a> {
    schema: &'a Schema,
    config: &'a Config,
    names: CrossRelationNames<'a>,
    resolver: &'a NameResolver<'a>,
    cross: &'a CrossRelation,
    /// Junction primary key reconstruction for staged deletions: one
    /// `(position, value expression)` per junction key column, positioned by
    /// the junction table's declared primary key order.
    entry_pk: Vec<(usize, String)>,
}

impl<'a> ManyToManyProducer<'a> {
    pub(super) fn new(
        schema: &'a Schema,
        resolver: &'a NameResolver<'a>,
        config: &'a Config,
        table: &'a Table,
        cross: &'a CrossRelation,
    ) -> Result<Self> {
        let names = CrossRelationNames::new(schema, resolver, cross);
        let middle = schema.table(cross.middle);

        let mut entry_pk = vec![];
        for pair in &names.incoming().columns {
            let position = middle_pk_position(schema, middle, pair.local, table)?;
            entry_pk.push((position, pk_value(schema, "$this", pair)));
        }
        for fk in names.crossing() {
            for pair in &fk.columns {
                let position = middle_pk_position(schema, middle, pair.local, table)?;
                entry_pk.push((position, pk_value(schema, "$entry", pair)));
            }
        }

        Ok(Self {
            schema,
            config,
            names,
            resolver,
            cross,
            entry_pk,
        })
    }

    fn target_fk(&self) -> &'a ForeignKey {
        self.schema.foreign_key(self.cross.crossing[0])
    }

    fn target(&self) -> &'a Table {
        self.target_fk().target_table(self.schema)
    }

    fn singular(&self) -> String {
        self.names.target_identifier(false)
    }

    fn plural(&self) -> String {
        self.names.target_identifier(true)
    }

    fn attribute(&self) -> String {
        self.names.attribute_collection_name()
    }

    fn partial_attribute(&self) -> String {
        self.names.attribute_partial_name()
    }

    fn scheduled_name(&self) -> String {
        self.names.attribute_scheduled_for_deletion_name()
    }

    /// The deletion-staging machinery is omitted when the junction referrer
    /// is one-to-one; there is no junction collection to diff against.
    fn stages_deletions(&self) -> bool {
        !self.names.incoming().is_local_primary_key(self.schema)
    }

    fn var(&self) -> String {
        lower_first(&self.singular())
    }

    fn middle_var(&self) -> String {
        lower_first(&self.names.middle_table().php_name())
    }

    /// This relation's name as the target's own generation derives it; names
    /// the `filterBy`/reverse-collection surface on the target class.
    fn reverse(&self, plural: bool) -> String {
        self.names.reverse_identifier_for(self.target_fk().id, plural)
    }

    fn clear_method(&self) -> String {
        let plural = self.plural();
        let attribute = self.attribute();

        format!(
            "/**\n * Clears out the {attribute} collection\n *\n * This does not modify the database; however, it will remove any associated objects, causing\n * them to be refetched by subsequent calls to accessor method.\n *\n * @return $this\n */\npublic function clear{plural}()\n{{\n    $this->{attribute} = null; // important to set this to NULL since that means it is uninitialized\n\n    return $this;\n}}\n"
        )
    }

    fn init_method(&self, imports: &mut ImportRegistry) -> String {
        let plural = self.plural();
        let attribute = self.attribute();
        let collection = object_collection_class(imports, self.config);
        let model = format!(
            "\\{}\\{}",
            self.config.model_namespace,
            self.target().php_name()
        );

        format!(
            "/**\n * Initializes the {attribute} crossRef collection.\n *\n * By default this just sets the {attribute} collection to an empty collection (like clear{plural}());\n * however, you may wish to override this method in your stub class to provide setting appropriate\n * to your application -- for example, setting the initial array to the values stored in database.\n *\n * @return void\n */\npublic function init{plural}(): void\n{{\n    $collection = new {collection}();\n    $collection->setModel('{model}');\n\n    $this->{attribute} = $collection;\n}}\n"
        )
    }

    fn is_loaded_method(&self) -> String {
        let plural = self.plural();
        let attribute = self.attribute();

        format!(
            "/**\n * Checks if the {attribute} collection is loaded.\n *\n * @return bool\n */\npublic function is{plural}Loaded(): bool\n{{\n    return $this->{attribute} !== null;\n}}\n"
        )
    }

    fn get_method(&self, imports: &mut ImportRegistry) -> String {
        let plural = self.plural();
        let attribute = self.attribute();
        let partial = self.partial_attribute();
        let class = model_class(imports, self.config, self.target());
        let query = query_class(imports, self.config, self.target());
        let criteria = criteria_class(imports, self.config);
        let connection = connection_interface(imports, self.config);
        let collection = object_collection_class(imports, self.config);
        let middle_class = model_class(imports, self.config, self.names.middle_table());
        let filter = self.reverse(false);

        format!(
            "/**\n * Gets a collection of {class} objects related by a many-to-many relationship\n * to the current object by way of the {middle_class} cross-reference table.\n *\n * If the $criteria is not null, it is used to always fetch the results from the database.\n * Otherwise the results are fetched from the database the first time, then cached.\n * Next time the same method is called without $criteria, the cached collection is returned.\n * If this object is new, it will return an empty collection or the current collection; the criteria is ignored on a new object.\n *\n * @param {criteria}|null $criteria Optional query object to filter the query\n * @param {connection}|null $con Optional connection object\n * @return {collection}|{class}[] List of {class} objects\n */\npublic function get{plural}(?{criteria} $criteria = null, ?{connection} $con = null)\n{{\n    $partial = $this->{partial} && !$this->isNew();\n    if ($this->{attribute} === null || $criteria !== null || $partial) {{\n        if ($this->isNew()) {{\n            // return empty collection\n            if ($this->{attribute} === null) {{\n                $this->init{plural}();\n            }}\n        }} else {{\n            ${attribute} = {query}::create(null, $criteria)\n                ->filterBy{filter}($this)\n                ->find($con);\n\n            if ($criteria !== null) {{\n                return ${attribute};\n            }}\n\n            if ($partial && $this->{attribute}) {{\n                // make sure that already added objects gets added to the list of the database\n                foreach ($this->{attribute} as $obj) {{\n                    if (!${attribute}->contains($obj)) {{\n                        ${attribute}[] = $obj;\n                    }}\n                }}\n            }}\n\n            $this->{attribute} = ${attribute};\n            $this->{partial} = false;\n        }}\n    }}\n\n    return $this->{attribute};\n}}\n"
        )
    }

    fn set_method(&self, imports: &mut ImportRegistry) -> String {
        let plural = self.plural();
        let singular = self.singular();
        let attribute = self.attribute();
        let partial = self.partial_attribute();
        let class = model_class(imports, self.config, self.target());
        let middle_class = model_class(imports, self.config, self.names.middle_table());
        let collection = collection_interface(imports, self.config);
        let object_collection = object_collection_class(imports, self.config);
        let connection = connection_interface(imports, self.config);
        let var = self.var();
        let var_plural = lower_first(&plural);

        format!(
            "/**\n * Sets a collection of {class} objects related by a many-to-many relationship\n * to the current object by way of the {middle_class} cross-reference table.\n * It will also schedule objects for deletion based on a diff between old objects (aka persisted)\n * and new objects from the given Propel collection.\n *\n * @param {collection} ${var_plural} A Propel collection.\n * @param {connection}|null $con Optional connection object\n * @return $this\n */\npublic function set{plural}({collection} ${var_plural}, ?{connection} $con = null)\n{{\n    $this->clear{plural}();\n    $current{plural} = $this->get{plural}();\n\n    ${var_plural}ScheduledForDeletion = $current{plural}->diff(${var_plural});\n\n    foreach (${var_plural}ScheduledForDeletion as $toDelete) {{\n        $this->remove{singular}($toDelete);\n    }}\n\n    foreach (${var_plural} as ${var}) {{\n        if (!$current{plural}->contains(${var})) {{\n            $this->doAdd{singular}(${var});\n        }}\n    }}\n\n    $this->{partial} = false;\n    $this->{attribute} = ${var_plural} instanceof {object_collection} ? clone ${var_plural} : ${var_plural};\n\n    return $this;\n}}\n"
        )
    }

    fn count_method(&self, imports: &mut ImportRegistry) -> String {
        let plural = self.plural();
        let attribute = self.attribute();
        let partial = self.partial_attribute();
        let class = model_class(imports, self.config, self.target());
        let query = query_class(imports, self.config, self.target());
        let criteria = criteria_class(imports, self.config);
        let connection = connection_interface(imports, self.config);
        let middle_class = model_class(imports, self.config, self.names.middle_table());
        let filter = self.reverse(false);

        format!(
            "/**\n * Gets the number of {class} objects related by a many-to-many relationship\n * to the current object by way of the {middle_class} cross-reference table.\n *\n * @param {criteria}|null $criteria Optional query object to filter the query\n * @param bool $distinct Set to true to force count distinct\n * @param {connection}|null $con Optional connection object\n * @return int The number of related {class} objects\n */\npublic function count{plural}(?{criteria} $criteria = null, bool $distinct = false, ?{connection} $con = null): int\n{{\n    $partial = $this->{partial} && !$this->isNew();\n    if ($this->{attribute} === null || $criteria !== null || $partial) {{\n        if ($this->isNew() && $this->{attribute} === null) {{\n            return 0;\n        }}\n\n        if ($partial && !$criteria) {{\n            return count($this->get{plural}());\n        }}\n\n        $query = {query}::create(null, $criteria);\n        if ($distinct) {{\n            $query->distinct();\n        }}\n\n        return $query\n            ->filterBy{filter}($this)\n            ->count($con);\n    }}\n\n    return count($this->{attribute});\n}}\n"
        )
    }

    fn add_method(&self, imports: &mut ImportRegistry) -> String {
        let plural = self.plural();
        let singular = self.singular();
        let attribute = self.attribute();
        let class = model_class(imports, self.config, self.target());
        let middle_class = model_class(imports, self.config, self.names.middle_table());
        let var = self.var();

        format!(
            "/**\n * Associate a {class} to this object\n * through the {middle_class} cross reference table.\n *\n * @param {class} ${var}\n * @return $this The current object (for fluent API support)\n */\npublic function add{singular}({class} ${var})\n{{\n    if ($this->{attribute} === null) {{\n        $this->init{plural}();\n    }}\n\n    if (!$this->get{plural}()->contains(${var})) {{\n        // only add it if the **same** object is not already associated\n        $this->{attribute}->push(${var});\n        $this->doAdd{singular}(${var});\n    }}\n\n    return $this;\n}}\n"
        )
    }

    fn do_add_method(&self, imports: &mut ImportRegistry) -> String {
        let singular = self.singular();
        let class = model_class(imports, self.config, self.target());
        let middle_class = model_class(imports, self.config, self.names.middle_table());
        let middle_singular = self.names.middle_table_identifier(false);
        let target_setter = self.resolver.identifier(self.target_fk(), false, false);
        let source_setter = self.resolver.identifier(self.names.incoming(), false, false);
        let reverse_plural = self.reverse(true);
        let var = self.var();
        let middle_var = self.middle_var();

        // A junction whose incoming key covers its whole primary key has a
        // one-to-one referrer on this side; route through its setter.
        let attach = if self.stages_deletions() {
            format!("$this->add{middle_singular}(${middle_var});")
        } else {
            format!("$this->set{middle_singular}(${middle_var});")
        };

        format!(
            "/**\n * @param {class} ${var}\n */\nprotected function doAdd{singular}({class} ${var}): void\n{{\n    ${middle_var} = new {middle_class}();\n\n    ${middle_var}->set{target_setter}(${var});\n\n    ${middle_var}->set{source_setter}($this);\n\n    {attach}\n\n    // set the back reference to this object directly as using provided method either results\n    // in endless loop or in multiple relations\n    if (${var}->is{reverse_plural}Loaded() && !${var}->get{reverse_plural}()->contains($this)) {{\n        ${var}->get{reverse_plural}()->push($this);\n    }}\n}}\n"
        )
    }

    fn remove_method(&self, imports: &mut ImportRegistry) -> String {
        let plural = self.plural();
        let singular = self.singular();
        let attribute = self.attribute();
        let scheduled = self.scheduled_name();
        let class = model_class(imports, self.config, self.target());
        let middle_class = model_class(imports, self.config, self.names.middle_table());
        let middle_singular = self.names.middle_table_identifier(false);
        let target_setter = self.resolver.identifier(self.target_fk(), false, false);
        let source_setter = self.resolver.identifier(self.names.incoming(), false, false);
        let reverse_plural = self.reverse(true);
        let var = self.var();
        let middle_var = self.middle_var();

        let staging = if self.stages_deletions() {
            format!(
                "\n        if ($this->{scheduled} === null) {{\n            $this->{scheduled} = clone $this->{attribute};\n            $this->{scheduled}->clear();\n        }}\n\n        $this->{scheduled}[] = ${var};\n"
            )
        } else {
            String::new()
        };

        let detach = if self.stages_deletions() {
            format!("$this->remove{middle_singular}(clone ${middle_var});\n        ${middle_var}->clear();")
        } else {
            format!("$this->set{middle_singular}(null);\n        ${middle_var}->clear();")
        };

        format!(
            "/**\n * Remove {var} of this object\n * through the {middle_class} cross reference table.\n *\n * @param {class} ${var}\n * @return $this The current object (for fluent API support)\n */\npublic function remove{singular}({class} ${var})\n{{\n    if ($this->get{plural}()->contains(${var})) {{\n        ${middle_var} = new {middle_class}();\n        ${middle_var}->set{target_setter}(${var});\n        if (${var}->is{reverse_plural}Loaded()) {{\n            //remove the back reference if available\n            ${var}->get{reverse_plural}()->removeObject($this);\n        }}\n\n        ${middle_var}->set{source_setter}($this);\n        {detach}\n\n        $this->{attribute}->remove($this->{attribute}->search(${var}));\n{staging}    }}\n\n    return $this;\n}}\n"
        )
    }
}

/// One junction key value expression: the referenced column's getter on the
/// owning variable, or the mapped literal typed by the local column.
fn pk_value(
    schema: &Schema,
    var: &str,
    pair: &activegen_core::schema::ColumnPair,
) -> String {
    match &pair.foreign {
        MappedColumn::Column(id) => {
            format!("{var}->get{}()", schema.column(*id).php_name())
        }
        MappedColumn::Literal(value) => php::column_literal(schema.column(pair.local), value),
    }
}

impl RelationCodeProducer for ManyToManyProducer<'_> {
    fn attributes(&self, imports: &mut ImportRegistry) -> String {
        let class = model_class(imports, self.config, self.target());
        let collection = object_collection_class(imports, self.config);

        format!(
            "/**\n * @var {collection}|{class}[] Cross Collection to store aggregation of {class} objects.\n */\nprotected ${};\n\n/**\n * @var bool\n */\nprotected ${};\n",
            self.attribute(),
            self.partial_attribute()
        )
    }

    fn scheduled_attribute(&self, imports: &mut ImportRegistry) -> String {
        if !self.stages_deletions() {
            return String::new();
        }

        let class = model_class(imports, self.config, self.target());
        let collection = object_collection_class(imports, self.config);

        format!(
            "/**\n * An array of objects scheduled for deletion.\n * @var {collection}|{class}[]\n */\nprotected ${} = null;\n",
            self.scheduled_name()
        )
    }

    fn methods(&self, imports: &mut ImportRegistry) -> String {
        [
            self.clear_method(),
            self.init_method(imports),
            self.is_loaded_method(),
            self.get_method(imports),
            self.set_method(imports),
            self.count_method(imports),
            self.add_method(imports),
            self.do_add_method(imports),
            self.remove_method(imports),
        ]
        .join("\n")
    }

    fn on_reload(&self) -> String {
        format!("$this->{} = null;\n", self.attribute())
    }

    fn clear_references(&self) -> ClearReferences {
        let attribute = self.attribute();
        ClearReferences {
            statements: format!(
                "if ($this->{attribute}) {{\n    foreach ($this->{attribute} as $o) {{\n        $o->clearAllReferences($deep);\n    }}\n}}\n"
            ),
            attributes: vec![attribute],
        }
    }

    fn save_code(&self, imports: &mut ImportRegistry) -> String {
        let attribute = self.attribute();
        let var = self.var();

        let deletion = if self.stages_deletions() {
            let scheduled = self.scheduled_name();
            let middle_query = query_class(imports, self.config, self.names.middle_table());

            let mut assignments = String::new();
            for (position, value) in &self.entry_pk {
                let _ = writeln!(assignments, "            $entryPk[{position}] = {value};");
            }

            format!(
                "if ($this->{scheduled} !== null) {{\n    if (!$this->{scheduled}->isEmpty()) {{\n        $pks = [];\n        foreach ($this->{scheduled} as $entry) {{\n            $entryPk = [];\n\n{assignments}            $pks[] = $entryPk;\n        }}\n\n        {middle_query}::create()\n            ->filterByPrimaryKeys($pks)\n            ->delete($con);\n\n        $this->{scheduled} = null;\n    }}\n}}\n\n"
            )
        } else {
            String::new()
        };

        format!(
            "{deletion}if ($this->{attribute}) {{\n    foreach ($this->{attribute} as ${var}) {{\n        if (!${var}->isDeleted() && (${var}->isNew() || ${var}->isModified())) {{\n            ${var}->save($con);\n        }}\n    }}\n}}\n"
        )
    }
}
