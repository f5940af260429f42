use super::{
    collection_interface, combination_collection_class, connection_interface, criteria_class,
    middle_pk_position, model_class, query_class, ClearReferences, Config, RelationCodeProducer,
};
use crate::cross::CrossRelationNames;
use crate::error::Result;
use crate::imports::ImportRegistry;
use crate::names::NameResolver;
use crate::php::{self, lower_first};
use crate::signature::{DefaultPolicy, SignatureBuilder};

use activegen_core::schema::{
    ColumnPair, CrossRelation, ForeignKey, MappedColumn, Schema, Table,
};

use std::fmt::Write;

/// Emits a multi-participant cross relation: the junction table relates this
/// object to a tuple of other objects and discriminator values, stored as an
/// ordered combination collection. Tuple order is fixed as crossing targets
/// in junction declaration order followed by discriminator columns.
pub(super) struct TernaryProducer<'a> {
    schema: &'a Schema,
    config: &'a Config,
    names: CrossRelationNames<'a>,
    resolver: &'a NameResolver<'a>,
    cross: &'a CrossRelation,
    /// Junction primary key reconstruction for staged deletions, positioned
    /// by the junction table's declared primary key order.
    entry_pk: Vec<(usize, String)>,
}

impl<'a> TernaryProducer<'a> {
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
        for (index, fk) in names.crossing().enumerate() {
            for pair in &fk.columns {
                let position = middle_pk_position(schema, middle, pair.local, table)?;
                let var = format!("$combination[{index}]");
                entry_pk.push((position, pk_value(schema, &var, pair)));
            }
        }
        let offset = cross.crossing.len();
        for (index, column) in names.unclassified().enumerate() {
            let position = middle_pk_position(schema, middle, column.id, table)?;
            entry_pk.push((position, format!("$combination[{}]", offset + index)));
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

    fn compound(&self) -> String {
        self.names.target_identifier(false)
    }

    fn compound_plural(&self) -> String {
        self.names.target_identifier(true)
    }

    fn add_name(&self) -> String {
        self.names.add_identifier()
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

    /// Full participant tuple: crossing targets then discriminator columns.
    fn signature(&self, policy: DefaultPolicy) -> SignatureBuilder {
        let mut signature = SignatureBuilder::default();
        for fk in self.names.crossing() {
            signature.add_cross_target(self.schema, self.resolver, fk, policy);
        }
        for column in self.names.unclassified() {
            signature.add_column(column, policy);
        }
        signature
    }

    /// Participants other than `target`, all optional; the filter arguments
    /// of the per-target query helper.
    fn query_signature(&self, target: &ForeignKey) -> SignatureBuilder {
        let mut signature = SignatureBuilder::default();
        for fk in self.names.crossing() {
            if fk.id != target.id {
                signature.add_cross_target(self.schema, self.resolver, fk, DefaultPolicy::Null);
            }
        }
        for column in self.names.unclassified() {
            signature.add_column(column, DefaultPolicy::Null);
        }
        signature
    }

    /// Call arguments naming the reverse combination as seen from `target`:
    /// every other participant in junction declaration order, with `$this`
    /// standing in for the incoming side.
    fn reverse_arguments(&self, target: &ForeignKey) -> String {
        let mut args = vec![];
        for fk in &self.names.middle_table().foreign_keys {
            if fk.id == target.id {
                continue;
            }
            if fk.id == self.cross.incoming {
                args.push("$this".to_string());
            } else {
                args.push(format!("${}", self.resolver.identifier(fk, false, true)));
            }
        }
        for column in self.names.unclassified() {
            args.push(format!("${}", column.name.camel_case()));
        }
        args.join(", ")
    }

    fn clear_method(&self) -> String {
        let plural = self.compound_plural();
        let attribute = self.attribute();

        format!(
            "/**\n * Clears out the {attribute} collection\n *\n * This does not modify the database; however, it will remove any associated objects, causing\n * them to be refetched by subsequent calls to accessor method.\n *\n * @return $this\n */\npublic function clear{plural}()\n{{\n    $this->{attribute} = null; // important to set this to NULL since that means it is uninitialized\n\n    return $this;\n}}\n"
        )
    }

    fn init_method(&self, imports: &mut ImportRegistry) -> String {
        let plural = self.compound_plural();
        let attribute = self.attribute();
        let collection = combination_collection_class(imports, self.config);

        format!(
            "/**\n * Initializes the {attribute} crossRef collection.\n *\n * By default this just sets the {attribute} collection to an empty collection (like clear{plural}());\n * however, you may wish to override this method in your stub class to provide setting appropriate\n * to your application -- for example, setting the initial array to the values stored in database.\n *\n * @return void\n */\npublic function init{plural}(): void\n{{\n    $this->{attribute} = new {collection}();\n}}\n"
        )
    }

    fn is_loaded_method(&self) -> String {
        let plural = self.compound_plural();
        let attribute = self.attribute();

        format!(
            "/**\n * Checks if the {attribute} collection is loaded.\n *\n * @return bool\n */\npublic function is{plural}Loaded(): bool\n{{\n    return $this->{attribute} !== null;\n}}\n"
        )
    }

    fn get_method(&self, imports: &mut ImportRegistry) -> String {
        let plural = self.compound_plural();
        let attribute = self.attribute();
        let partial = self.partial_attribute();
        let middle_query = query_class(imports, self.config, self.names.middle_table());
        let criteria = criteria_class(imports, self.config);
        let connection = connection_interface(imports, self.config);
        let collection = combination_collection_class(imports, self.config);
        let source = self.resolver.identifier(self.names.incoming(), false, false);
        let element = self.signature(DefaultPolicy::None).element_type();

        let mut joins = String::new();
        for fk in self.names.crossing() {
            let _ = write!(
                joins,
                "\n                ->{}{}()",
                self.config.join_with_method,
                self.resolver.identifier(fk, false, false)
            );
        }

        let mut fold = String::new();
        for fk in self.names.crossing() {
            let _ = writeln!(
                fold,
                "                $combination[] = $item->get{}();",
                self.resolver.identifier(fk, false, false)
            );
        }
        for column in self.names.unclassified() {
            let _ = writeln!(
                fold,
                "                $combination[] = $item->get{}();",
                column.php_name()
            );
        }

        format!(
            "/**\n * Gets a combined collection of {element} objects related by a many-to-many relationship\n * to the current object by way of the {0} cross-reference table.\n *\n * If the $criteria is not null, it is used to always fetch the results from the database.\n * Otherwise the results are fetched from the database the first time, then cached.\n * Next time the same method is called without $criteria, the cached collection is returned.\n * If this object is new, it will return an empty collection or the current collection; the criteria is ignored on a new object.\n *\n * @param {criteria}|null $criteria Optional query object to filter the query\n * @param {connection}|null $con Optional connection object\n * @return {collection} Combination list of {element} objects\n */\npublic function get{plural}(?{criteria} $criteria = null, ?{connection} $con = null)\n{{\n    $partial = $this->{partial} && !$this->isNew();\n    if ($this->{attribute} === null || $criteria !== null || $partial) {{\n        if ($this->isNew()) {{\n            // return empty collection\n            if ($this->{attribute} === null) {{\n                $this->init{plural}();\n            }}\n        }} else {{\n            $query = {middle_query}::create(null, $criteria)\n                ->filterBy{source}($this){joins};\n\n            $items = $query->find($con);\n            ${attribute} = new {collection}();\n            foreach ($items as $item) {{\n                $combination = [];\n\n{fold}                ${attribute}[] = $combination;\n            }}\n\n            if ($criteria !== null) {{\n                return ${attribute};\n            }}\n\n            if ($partial && $this->{attribute}) {{\n                // make sure that already added objects gets added to the list of the database\n                foreach ($this->{attribute} as $obj) {{\n                    if (!${attribute}->contains(...$obj)) {{\n                        ${attribute}[] = $obj;\n                    }}\n                }}\n            }}\n\n            $this->{attribute} = ${attribute};\n            $this->{partial} = false;\n        }}\n    }}\n\n    return $this->{attribute};\n}}\n",
            self.names.middle_table().php_name()
        )
    }

    fn set_method(&self, imports: &mut ImportRegistry) -> String {
        let plural = self.compound_plural();
        let compound = self.compound();
        let attribute = self.attribute();
        let partial = self.partial_attribute();
        let add_name = self.add_name();
        let collection = collection_interface(imports, self.config);
        let connection = connection_interface(imports, self.config);
        let element = self.signature(DefaultPolicy::None).element_type();
        let var_plural = lower_first(&plural);
        let var = lower_first(&compound);

        format!(
            "/**\n * Sets a collection of {element} combinations related by a many-to-many relationship\n * to the current object by way of the {0} cross-reference table.\n * It will also schedule objects for deletion based on a diff between old objects (aka persisted)\n * and new objects from the given collection.\n *\n * @param {collection} ${var_plural} A collection of combinations.\n * @param {connection}|null $con Optional connection object\n * @return $this\n */\npublic function set{plural}({collection} ${var_plural}, ?{connection} $con = null)\n{{\n    $this->clear{plural}();\n    $current{plural} = $this->get{plural}();\n\n    ${var_plural}ScheduledForDeletion = $current{plural}->diff(${var_plural});\n\n    foreach (${var_plural}ScheduledForDeletion as $toDelete) {{\n        $this->remove{compound}(...$toDelete);\n    }}\n\n    foreach (${var_plural} as ${var}) {{\n        if (!$current{plural}->contains(...${var})) {{\n            $this->doAdd{add_name}(...${var});\n        }}\n    }}\n\n    $this->{partial} = false;\n    $this->{attribute} = ${var_plural};\n\n    return $this;\n}}\n",
            self.names.middle_table().php_name()
        )
    }

    fn count_method(&self, imports: &mut ImportRegistry) -> String {
        let plural = self.compound_plural();
        let attribute = self.attribute();
        let partial = self.partial_attribute();
        let middle_query = query_class(imports, self.config, self.names.middle_table());
        let criteria = criteria_class(imports, self.config);
        let connection = connection_interface(imports, self.config);
        let source = self.resolver.identifier(self.names.incoming(), false, false);
        let element = self.signature(DefaultPolicy::None).element_type();

        format!(
            "/**\n * Gets the number of {element} combinations related by a many-to-many relationship\n * to the current object by way of the {0} cross-reference table.\n *\n * @param {criteria}|null $criteria Optional query object to filter the query\n * @param bool $distinct Set to true to force count distinct\n * @param {connection}|null $con Optional connection object\n * @return int The number of related combinations\n */\npublic function count{plural}(?{criteria} $criteria = null, bool $distinct = false, ?{connection} $con = null): int\n{{\n    $partial = $this->{partial} && !$this->isNew();\n    if ($this->{attribute} === null || $criteria !== null || $partial) {{\n        if ($this->isNew() && $this->{attribute} === null) {{\n            return 0;\n        }}\n\n        if ($partial && !$criteria) {{\n            return count($this->get{plural}());\n        }}\n\n        $query = {middle_query}::create(null, $criteria);\n        if ($distinct) {{\n            $query->distinct();\n        }}\n\n        return $query\n            ->filterBy{source}($this)\n            ->count($con);\n    }}\n\n    return count($this->{attribute});\n}}\n",
            self.names.middle_table().php_name()
        )
    }

    fn add_method(&self) -> String {
        let plural = self.compound_plural();
        let attribute = self.attribute();
        let add_name = self.add_name();
        let signature = self.signature(DefaultPolicy::None);
        let parameters = signature.parameters();
        let arguments = signature.call_arguments();
        let phpdoc = signature.phpdoc();

        format!(
            "/**\n * Associate a combination to this object\n * through the {0} cross reference table.\n *\n{phpdoc} * @return $this The current object (for fluent API support)\n */\npublic function add{add_name}({parameters})\n{{\n    if ($this->{attribute} === null) {{\n        $this->init{plural}();\n    }}\n\n    if (!$this->get{plural}()->contains({arguments})) {{\n        // only add it if the **same** object is not already associated\n        $this->{attribute}->push({arguments});\n        $this->doAdd{add_name}({arguments});\n    }}\n\n    return $this;\n}}\n",
            self.names.middle_table().php_name()
        )
    }

    fn do_add_method(&self, imports: &mut ImportRegistry) -> String {
        let add_name = self.add_name();
        let middle_class = model_class(imports, self.config, self.names.middle_table());
        let middle_singular = self.names.middle_table_identifier(false);
        let source_setter = self.resolver.identifier(self.names.incoming(), false, false);
        let signature = self.signature(DefaultPolicy::None);
        let parameters = signature.parameters();
        let phpdoc = signature.phpdoc();
        let middle_var = lower_first(&self.names.middle_table().php_name());

        let mut assignments = String::new();
        for fk in self.names.crossing() {
            let ident = self.resolver.identifier(fk, false, false);
            let var = self.resolver.identifier(fk, false, true);
            let _ = writeln!(assignments, "    ${middle_var}->set{ident}(${var});");
        }
        for column in self.names.unclassified() {
            let _ = writeln!(
                assignments,
                "    ${middle_var}->set{}(${});",
                column.php_name(),
                column.name.camel_case()
            );
        }

        let mut back_links = String::new();
        for fk in self.names.crossing() {
            let var = self.resolver.identifier(fk, false, true);
            let reverse = self.names.reverse_identifier_for(fk.id, true);
            let args = self.reverse_arguments(fk);
            let _ = write!(
                back_links,
                "\n    // set the back reference to this object directly as using provided method either results\n    // in endless loop or in multiple relations\n    if (${var}->is{reverse}Loaded() && !${var}->get{reverse}()->contains({args})) {{\n        ${var}->get{reverse}()->push({args});\n    }}\n"
            );
        }

        format!(
            "/**\n{phpdoc} */\nprotected function doAdd{add_name}({parameters}): void\n{{\n    ${middle_var} = new {middle_class}();\n\n{assignments}\n    ${middle_var}->set{source_setter}($this);\n\n    $this->add{middle_singular}(${middle_var});\n{back_links}}}\n"
        )
    }

    fn remove_method(&self, imports: &mut ImportRegistry) -> String {
        let plural = self.compound_plural();
        let compound = self.compound();
        let attribute = self.attribute();
        let scheduled = self.scheduled_name();
        let middle_class = model_class(imports, self.config, self.names.middle_table());
        let middle_singular = self.names.middle_table_identifier(false);
        let source_setter = self.resolver.identifier(self.names.incoming(), false, false);
        let signature = self.signature(DefaultPolicy::None);
        let parameters = signature.parameters();
        let arguments = signature.call_arguments();
        let phpdoc = signature.phpdoc();
        let middle_var = lower_first(&self.names.middle_table().php_name());

        let mut body = String::new();
        let _ = writeln!(body, "        ${middle_var} = new {middle_class}();");
        for fk in self.names.crossing() {
            let ident = self.resolver.identifier(fk, false, false);
            let var = self.resolver.identifier(fk, false, true);
            let reverse = self.names.reverse_identifier_for(fk.id, true);
            let args = self.reverse_arguments(fk);
            let _ = writeln!(body, "        ${middle_var}->set{ident}(${var});");
            let _ = writeln!(
                body,
                "        if (${var}->is{reverse}Loaded()) {{\n            //remove the back reference if available\n            ${var}->get{reverse}()->removeObject({args});\n        }}"
            );
        }
        for column in self.names.unclassified() {
            let _ = writeln!(
                body,
                "        ${middle_var}->set{}(${});",
                column.php_name(),
                column.name.camel_case()
            );
        }
        let _ = writeln!(body, "        ${middle_var}->set{source_setter}($this);");
        let _ = writeln!(
            body,
            "        $this->remove{middle_singular}(clone ${middle_var});"
        );
        let _ = writeln!(body, "        ${middle_var}->clear();");

        format!(
            "/**\n * Remove a combination from this object\n * through the {0} cross reference table.\n *\n{phpdoc} * @return $this The current object (for fluent API support)\n */\npublic function remove{compound}({parameters})\n{{\n    if ($this->get{plural}()->contains({arguments})) {{\n{body}\n        $this->{attribute}->remove($this->{attribute}->search({arguments}));\n\n        if ($this->{scheduled} === null) {{\n            $this->{scheduled} = clone $this->{attribute};\n            $this->{scheduled}->clear();\n        }}\n\n        $this->{scheduled}[] = [{arguments}];\n    }}\n\n    return $this;\n}}\n",
            self.names.middle_table().php_name()
        )
    }

    /// Per-crossing-target query helpers: a filtered, uncached view of one
    /// participant position of the relation.
    fn target_query_methods(&self, imports: &mut ImportRegistry) -> Vec<String> {
        let mut methods = vec![];

        for fk in self.names.crossing() {
            let target = fk.target_table(self.schema);
            let class = model_class(imports, self.config, target);
            let query = query_class(imports, self.config, target);
            let criteria = criteria_class(imports, self.config);
            let connection = connection_interface(imports, self.config);
            let collection = collection_interface(imports, self.config);
            let source = self.resolver.identifier(self.names.incoming(), false, false);
            let target_plural = self.resolver.identifier(fk, true, false);
            // Relation name from the target back to the junction table.
            let middle_relation = self.resolver.reversed_identifier(fk, false, false);

            let signature = self.query_signature(fk);
            let parameters = if signature.is_empty() {
                format!("?{criteria} $criteria = null")
            } else {
                format!("{}, ?{criteria} $criteria = null", signature.parameters())
            };
            let phpdoc = signature.phpdoc();
            let nulls = "null, ".repeat(
                self.cross.crossing.len() - 1 + self.cross.unclassified_primary_keys.len(),
            );

            let mut filters = String::new();
            for other in self.names.crossing() {
                if other.id == fk.id {
                    continue;
                }
                let ident = self.resolver.identifier(other, false, false);
                let var = self.resolver.identifier(other, false, true);
                let _ = write!(
                    filters,
                    "\n    if (${var} !== null) {{\n        $junction->filterBy{ident}(${var});\n    }}\n"
                );
            }
            for column in self.names.unclassified() {
                let ident = column.php_name();
                let var = column.name.camel_case();
                let _ = write!(
                    filters,
                    "\n    if (${var} !== null) {{\n        $junction->filterBy{ident}(${var});\n    }}\n"
                );
            }

            methods.push(format!(
                "/**\n * Returns a new query object pre-configured with filters from current object and given arguments to related {class} objects.\n *\n{phpdoc} * @param {criteria}|null $criteria\n * @return {query}\n */\npublic function create{target_plural}Query({parameters})\n{{\n    $query = {query}::create($criteria);\n\n    $junction = $query->use{middle_relation}Query()\n        ->filterBy{source}($this);\n{filters}\n    $junction->endUse();\n\n    return $query;\n}}\n"
            ));

            methods.push(format!(
                "/**\n * Returns a not cached collection of {class} objects. This will hit always the database.\n *\n * If you have attached new {class} object to this object you need to call `save` first to get\n * the correct return value. Use get{0}() to get the current internal state.\n *\n * @param {criteria}|null $criteria\n * @param {connection}|null $con\n * @return {collection}|{class}[]\n */\npublic function get{target_plural}(?{criteria} $criteria = null, ?{connection} $con = null)\n{{\n    return $this->create{target_plural}Query({nulls}$criteria)->find($con);\n}}\n",
                self.compound_plural()
            ));

            methods.push(format!(
                "/**\n * Returns the not cached count of {class} objects. This will hit always the database.\n *\n * @param {criteria}|null $criteria\n * @param {connection}|null $con\n * @return int\n */\npublic function count{target_plural}(?{criteria} $criteria = null, ?{connection} $con = null): int\n{{\n    return $this->create{target_plural}Query({nulls}$criteria)->count($con);\n}}\n"
            ));
        }

        methods
    }
}

/// One junction key value expression against `var`, or the mapped literal
/// typed by the local column.
fn pk_value(schema: &Schema, var: &str, pair: &ColumnPair) -> String {
    match &pair.foreign {
        MappedColumn::Column(id) => {
            format!("{var}->get{}()", schema.column(*id).php_name())
        }
        MappedColumn::Literal(value) => php::column_literal(schema.column(pair.local), value),
    }
}

impl RelationCodeProducer for TernaryProducer<'_> {
    fn attributes(&self, imports: &mut ImportRegistry) -> String {
        let collection = combination_collection_class(imports, self.config);
        let element = self.signature(DefaultPolicy::None).element_type();

        format!(
            "/**\n * @var {collection} Combination collection.\n * Cross collection to store aggregation of {element} combinations.\n */\nprotected ${};\n\n/**\n * @var bool\n */\nprotected ${};\n",
            self.attribute(),
            self.partial_attribute()
        )
    }

    fn scheduled_attribute(&self, imports: &mut ImportRegistry) -> String {
        let collection = combination_collection_class(imports, self.config);

        format!(
            "/**\n * An array of objects scheduled for deletion.\n * @var {collection}\n */\nprotected ${} = null;\n",
            self.scheduled_name()
        )
    }

    fn methods(&self, imports: &mut ImportRegistry) -> String {
        let mut methods = vec![
            self.clear_method(),
            self.init_method(imports),
            self.is_loaded_method(),
            self.get_method(imports),
            self.set_method(imports),
            self.count_method(imports),
            self.add_method(),
            self.do_add_method(imports),
            self.remove_method(imports),
        ];
        methods.extend(self.target_query_methods(imports));
        methods.join("\n")
    }

    fn on_reload(&self) -> String {
        format!("$this->{} = null;\n", self.attribute())
    }

    fn clear_references(&self) -> ClearReferences {
        let attribute = self.attribute();

        let mut clears = String::new();
        for index in 0..self.cross.crossing.len() {
            let _ = writeln!(clears, "        $o[{index}]->clearAllReferences($deep);");
        }

        ClearReferences {
            statements: format!(
                "if ($this->{attribute}) {{\n    foreach ($this->{attribute} as $o) {{\n{clears}    }}\n}}\n"
            ),
            attributes: vec![attribute],
        }
    }

    fn save_code(&self, imports: &mut ImportRegistry) -> String {
        let attribute = self.attribute();
        let scheduled = self.scheduled_name();
        let middle_query = query_class(imports, self.config, self.names.middle_table());

        let mut assignments = String::new();
        for (position, value) in &self.entry_pk {
            let _ = writeln!(assignments, "            $entryPk[{position}] = {value};");
        }

        let mut cascades = String::new();
        for index in 0..self.cross.crossing.len() {
            let _ = write!(
                cascades,
                "        $model = $combination[{index}];\n        if (!$model->isDeleted() && ($model->isNew() || $model->isModified())) {{\n            $model->save($con);\n        }}\n"
            );
        }

        format!(
            "if ($this->{scheduled} !== null) {{\n    if (!$this->{scheduled}->isEmpty()) {{\n        $pks = [];\n        foreach ($this->{scheduled} as $combination) {{\n            $entryPk = [];\n\n{assignments}            $pks[] = $entryPk;\n        }}\n\n        {middle_query}::create()\n            ->filterByPrimaryKeys($pks)\n            ->delete($con);\n\n        $this->{scheduled} = null;\n    }}\n}}\n\nif ($this->{attribute}) {{\n    foreach ($this->{attribute} as $combination) {{\n{cascades}    }}\n}}\n"
        )
    }
}
