use indexmap::IndexSet;

/// Insertion-ordered registry of fully qualified class names referenced by
/// the emitted fragments.
///
/// Producers register every class they mention and embed the returned short
/// name; the enclosing file builder turns the registry into use statements
/// and resolves aliasing collisions.
#[derive(Debug, Default)]
pub struct ImportRegistry {
    classes: IndexSet<String>,
}

impl ImportRegistry {
    /// Registers a class and returns the short name to embed in code.
    pub fn register(&mut self, fqcn: &str) -> String {
        self.classes.insert(fqcn.to_string());
        fqcn.rsplit('\\').next().unwrap_or(fqcn).to_string()
    }

    /// Registered classes, in first-use order.
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.classes.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_once_and_returns_short_name() {
        let mut imports = ImportRegistry::default();
        assert_eq!(imports.register("Runtime\\Collection\\ObjectCollection"), "ObjectCollection");
        assert_eq!(imports.register("Runtime\\Collection\\ObjectCollection"), "ObjectCollection");
        assert_eq!(imports.classes().count(), 1);
    }
}
