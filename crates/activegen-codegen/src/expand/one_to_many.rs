use super::{
    collection_interface, connection_interface, criteria_class, model_class,
    object_collection_class, query_class, ClearReferences, Config, RelationCodeProducer,
};
use crate::imports::ImportRegistry;
use crate::names::NameResolver;
use crate::php::lower_first;

use activegen_core::schema::{ForeignKey, Schema, Table};

/// Emits the referenced side of a one-to-many relation: a lazily loaded
/// collection with partial-load tracking, diff-based replacement, and
/// deferred deletion staged until the owning object saves.
pub(super) struct OneToManyProducer<'a> {
    schema: &'a Schema,
    resolver: &'a NameResolver<'a>,
    config: &'a Config,
    fk: &'a ForeignKey,
}

impl<'a> OneToManyProducer<'a> {
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

    fn singular(&self) -> String {
        self.resolver.reversed_identifier(self.fk, false, false)
    }

    fn plural(&self) -> String {
        self.resolver.reversed_identifier(self.fk, true, false)
    }

    fn attribute(&self) -> String {
        format!("coll{}", self.plural())
    }

    fn partial_attribute(&self) -> String {
        format!("{}Partial", self.attribute())
    }

    fn scheduled_attribute_name(&self) -> String {
        format!("{}ScheduledForDeletion", lower_first(&self.plural()))
    }

    /// Setter on the child pointing back at this object.
    fn forward_name(&self) -> String {
        self.resolver.identifier(self.fk, false, false)
    }

    fn child(&self) -> &'a Table {
        self.fk.source_table(self.schema)
    }

    fn var(&self) -> String {
        lower_first(&self.singular())
    }

    /// A removed child is cloned into the staging collection when reusing the
    /// live instance could alias later mutations into the deferred delete:
    /// composite keys, or a local column that cannot be nulled out.
    fn stages_clone(&self) -> bool {
        self.fk.is_composite() || self.fk.is_required(self.schema)
    }

    /// Staged rows are bulk-deleted when the child cannot live without the
    /// parent; otherwise each child saves its nulled-out key itself.
    fn bulk_deletes(&self) -> bool {
        self.fk.is_required(self.schema) || self.fk.on_delete_cascade()
    }

    fn clear_method(&self) -> String {
        let plural = self.plural();
        let attribute = self.attribute();

        format!(
            "/**\n * Clears out the {attribute} collection\n *\n * This does not modify the database; however, it will remove any associated objects, causing\n * them to be refetched by subsequent calls to accessor method.\n *\n * @return $this\n */\npublic function clear{plural}()\n{{\n    $this->{attribute} = null; // important to set this to NULL since that means it is uninitialized\n\n    return $this;\n}}\n"
        )
    }

    fn reset_partial_method(&self) -> String {
        let plural = self.plural();
        let partial = self.partial_attribute();

        format!(
            "/**\n * Reset is the {} collection loaded partially.\n *\n * @return void\n */\npublic function resetPartial{plural}($v = true): void\n{{\n    $this->{partial} = $v;\n}}\n",
            self.attribute()
        )
    }

    fn init_method(&self, imports: &mut ImportRegistry) -> String {
        let plural = self.plural();
        let attribute = self.attribute();
        let collection = object_collection_class(imports, self.config);
        let model = format!(
            "\\{}\\{}",
            self.config.model_namespace,
            self.child().php_name()
        );

        format!(
            "/**\n * Initializes the {attribute} collection.\n *\n * By default this just sets the {attribute} collection to an empty array (like clear{plural}());\n * however, you may wish to override this method in your stub class to provide setting appropriate\n * to your application -- for example, setting the initial array to the values stored in database.\n *\n * @param bool $overrideExisting If set to true, the method call initializes\n *                               the collection even if it is not empty\n * @return void\n */\npublic function init{plural}(bool $overrideExisting = true): void\n{{\n    if ($this->{attribute} !== null && !$overrideExisting) {{\n        return;\n    }}\n\n    $this->{attribute} = new {collection}();\n    $this->{attribute}->setModel('{model}');\n}}\n"
        )
    }

    fn get_method(&self, imports: &mut ImportRegistry) -> String {
        let plural = self.plural();
        let attribute = self.attribute();
        let partial = self.partial_attribute();
        let class = model_class(imports, self.config, self.child());
        let query = query_class(imports, self.config, self.child());
        let criteria = criteria_class(imports, self.config);
        let connection = connection_interface(imports, self.config);
        let collection = object_collection_class(imports, self.config);
        let forward = self.forward_name();

        format!(
            "/**\n * Gets an array of {class} objects which contain a foreign key that references this object.\n *\n * If the $criteria is not null, it is used to always fetch the results from the database.\n * Otherwise the results are fetched from the database the first time, then cached.\n * Next time the same method is called without $criteria, the cached collection is returned.\n * If this object is new, it will return an empty collection; the criteria is ignored on a new object.\n *\n * @param {criteria}|null $criteria optional Criteria object to narrow the query\n * @param {connection}|null $con optional connection object\n * @return {collection}|{class}[] List of {class} objects\n */\npublic function get{plural}(?{criteria} $criteria = null, ?{connection} $con = null)\n{{\n    $partial = $this->{partial} && !$this->isNew();\n    if ($this->{attribute} === null || $criteria !== null || $partial) {{\n        if ($this->isNew()) {{\n            // return empty collection\n            if ($this->{attribute} === null) {{\n                $this->init{plural}();\n            }}\n        }} else {{\n            ${attribute} = {query}::create(null, $criteria)\n                ->filterBy{forward}($this)\n                ->find($con);\n\n            if ($criteria !== null) {{\n                if (false !== $this->{partial} && count(${attribute})) {{\n                    $this->init{plural}(false);\n\n                    foreach (${attribute} as $obj) {{\n                        if (false == $this->{attribute}->contains($obj)) {{\n                            $this->{attribute}->append($obj);\n                        }}\n                    }}\n\n                    $this->{partial} = true;\n                }}\n\n                return ${attribute};\n            }}\n\n            if ($partial && $this->{attribute}) {{\n                // New objects attached while only part of the collection was\n                // loaded stay visible in the merged result.\n                foreach ($this->{attribute} as $obj) {{\n                    if ($obj->isNew()) {{\n                        ${attribute}[] = $obj;\n                    }}\n                }}\n            }}\n\n            $this->{attribute} = ${attribute};\n            $this->{partial} = false;\n        }}\n    }}\n\n    return $this->{attribute};\n}}\n"
        )
    }

    fn set_method(&self, imports: &mut ImportRegistry) -> String {
        let plural = self.plural();
        let singular = self.singular();
        let attribute = self.attribute();
        let partial = self.partial_attribute();
        let scheduled = self.scheduled_attribute_name();
        let class = model_class(imports, self.config, self.child());
        let criteria = criteria_class(imports, self.config);
        let connection = connection_interface(imports, self.config);
        let collection = collection_interface(imports, self.config);
        let forward = self.forward_name();
        let var = self.var();
        let var_plural = lower_first(&plural);

        format!(
            "/**\n * Sets a collection of {class} objects related by a one-to-many relationship\n * to the current object.\n * It will also schedule objects for deletion based on a diff between old objects (aka persisted)\n * and new objects from the given collection.\n *\n * @param {collection} ${var_plural} A collection of {class} objects.\n * @param {connection}|null $con Optional connection object\n * @return $this\n */\npublic function set{plural}({collection} ${var_plural}, ?{connection} $con = null)\n{{\n    /** @var {class}[] ${var_plural}ToDelete */\n    ${var_plural}ToDelete = $this->get{plural}(new {criteria}(), $con)->diff(${var_plural});\n\n    $this->{scheduled} = clone ${var_plural}ToDelete;\n\n    foreach (${var_plural}ToDelete as ${var}Removed) {{\n        ${var}Removed->set{forward}(null);\n    }}\n\n    $this->{attribute} = null;\n    foreach (${var_plural} as ${var}) {{\n        $this->add{singular}(${var});\n    }}\n\n    $this->{attribute} = ${var_plural};\n    $this->{partial} = false;\n\n    return $this;\n}}\n"
        )
    }

    fn count_method(&self, imports: &mut ImportRegistry) -> String {
        let plural = self.plural();
        let attribute = self.attribute();
        let partial = self.partial_attribute();
        let query = query_class(imports, self.config, self.child());
        let criteria = criteria_class(imports, self.config);
        let connection = connection_interface(imports, self.config);
        let forward = self.forward_name();

        format!(
            "/**\n * Returns the number of related {0} objects.\n *\n * @param {criteria}|null $criteria\n * @param bool $distinct\n * @param {connection}|null $con\n * @return int Count of related {0} objects.\n */\npublic function count{plural}(?{criteria} $criteria = null, bool $distinct = false, ?{connection} $con = null): int\n{{\n    $partial = $this->{partial} && !$this->isNew();\n    if ($this->{attribute} === null || $criteria !== null || $partial) {{\n        if ($this->isNew() && $this->{attribute} === null) {{\n            return 0;\n        }}\n\n        if ($partial && !$criteria) {{\n            return count($this->get{plural}());\n        }}\n\n        $query = {query}::create(null, $criteria);\n        if ($distinct) {{\n            $query->distinct();\n        }}\n\n        return $query\n            ->filterBy{forward}($this)\n            ->count($con);\n    }}\n\n    return count($this->{attribute});\n}}\n",
            self.singular()
        )
    }

    fn add_method(&self, imports: &mut ImportRegistry) -> String {
        let plural = self.plural();
        let singular = self.singular();
        let attribute = self.attribute();
        let partial = self.partial_attribute();
        let scheduled = self.scheduled_attribute_name();
        let class = model_class(imports, self.config, self.child());

        format!(
            "/**\n * Method called to associate a {class} object to this object\n * through the {class} foreign key attribute.\n *\n * @param {class} $l {class}\n * @return $this\n */\npublic function add{singular}({class} $l)\n{{\n    if ($this->{attribute} === null) {{\n        $this->init{plural}();\n        $this->{partial} = true;\n    }}\n\n    if (!$this->{attribute}->contains($l)) {{\n        $this->doAdd{singular}($l);\n\n        if ($this->{scheduled} and $this->{scheduled}->contains($l)) {{\n            $this->{scheduled}->remove($this->{scheduled}->search($l));\n        }}\n    }}\n\n    return $this;\n}}\n"
        )
    }

    fn do_add_method(&self, imports: &mut ImportRegistry) -> String {
        let singular = self.singular();
        let attribute = self.attribute();
        let class = model_class(imports, self.config, self.child());
        let forward = self.forward_name();
        let var = self.var();

        format!(
            "/**\n * @param {class} ${var} The {class} object to add.\n */\nprotected function doAdd{singular}({class} ${var}): void\n{{\n    $this->{attribute}[] = ${var};\n    ${var}->set{forward}($this);\n}}\n"
        )
    }

    fn remove_method(&self, imports: &mut ImportRegistry) -> String {
        let plural = self.plural();
        let singular = self.singular();
        let attribute = self.attribute();
        let scheduled = self.scheduled_attribute_name();
        let class = model_class(imports, self.config, self.child());
        let forward = self.forward_name();
        let var = self.var();

        let staged = if self.stages_clone() {
            format!("clone ${var}")
        } else {
            format!("${var}")
        };

        format!(
            "/**\n * @param {class} ${var} The {class} object to remove.\n * @return $this\n */\npublic function remove{singular}({class} ${var})\n{{\n    if ($this->get{plural}()->contains(${var})) {{\n        $pos = $this->{attribute}->search(${var});\n        $this->{attribute}->remove($pos);\n        if ($this->{scheduled} === null) {{\n            $this->{scheduled} = clone $this->{attribute};\n            $this->{scheduled}->clear();\n        }}\n        $this->{scheduled}[] = {staged};\n        ${var}->set{forward}(null);\n    }}\n\n    return $this;\n}}\n"
        )
    }
}

impl RelationCodeProducer for OneToManyProducer<'_> {
    fn attributes(&self, imports: &mut ImportRegistry) -> String {
        let class = model_class(imports, self.config, self.child());
        let collection = object_collection_class(imports, self.config);

        format!(
            "/**\n * @var {collection}|{class}[] Collection to store aggregation of {class} objects.\n */\nprotected ${};\n\n/**\n * @var bool\n */\nprotected ${};\n",
            self.attribute(),
            self.partial_attribute()
        )
    }

    fn scheduled_attribute(&self, imports: &mut ImportRegistry) -> String {
        let class = model_class(imports, self.config, self.child());
        let collection = object_collection_class(imports, self.config);

        format!(
            "/**\n * An array of objects scheduled for deletion.\n * @var {collection}|{class}[]\n */\nprotected ${} = null;\n",
            self.scheduled_attribute_name()
        )
    }

    fn methods(&self, imports: &mut ImportRegistry) -> String {
        [
            self.clear_method(),
            self.reset_partial_method(),
            self.init_method(imports),
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
        let scheduled = self.scheduled_attribute_name();
        let var = self.var();

        let deletion = if self.bulk_deletes() {
            let query = query_class(imports, self.config, self.child());
            format!(
                "if ($this->{scheduled} !== null) {{\n    if (!$this->{scheduled}->isEmpty()) {{\n        {query}::create()\n            ->filterByPrimaryKeys($this->{scheduled}->getPrimaryKeys(false))\n            ->delete($con);\n        $this->{scheduled} = null;\n    }}\n}}\n"
            )
        } else {
            format!(
                "if ($this->{scheduled} !== null) {{\n    if (!$this->{scheduled}->isEmpty()) {{\n        foreach ($this->{scheduled} as ${var}) {{\n            // need to save related object because we set the relation to null\n            ${var}->save($con);\n        }}\n        $this->{scheduled} = null;\n    }}\n}}\n"
            )
        };

        format!(
            "{deletion}\nif ($this->{attribute} !== null) {{\n    foreach ($this->{attribute} as $referrerFK) {{\n        if (!$referrerFK->isDeleted() && ($referrerFK->isNew() || $referrerFK->isModified())) {{\n            $affectedRows += $referrerFK->save($con);\n        }}\n    }}\n}}\n"
        )
    }
}
