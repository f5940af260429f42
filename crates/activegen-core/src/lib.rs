pub mod pluralize;
pub use pluralize::{EnglishPluralizer, Pluralizer};

pub mod schema;
pub use schema::Schema;

/// A Result type alias used throughout the schema layer.
pub type Result<T> = anyhow::Result<T>;
