use thiserror::Error;

pub type Result<T> = std::result::Result<T, CodegenError>;

/// Errors surfaced while generating relationship code.
///
/// Generation aborts on the first error: a partially emitted class is not
/// usable output, so there is no recovery or degraded mode.
#[derive(Debug, Error)]
pub enum CodegenError {
    /// The schema graph does not admit a single interpretation of a relation.
    #[error("schema inconsistency on table `{table}`: {detail}")]
    SchemaInconsistency { table: String, detail: String },

    /// Two relations on the same table resolved to the same identifier even
    /// after `RelatedBy` disambiguation.
    #[error("relation identifier `{identifier}` collides on table `{table}`")]
    NamingCollision { table: String, identifier: String },
}

impl CodegenError {
    pub(crate) fn inconsistency(table: &str, detail: impl Into<String>) -> Self {
        Self::SchemaInconsistency {
            table: table.to_string(),
            detail: detail.into(),
        }
    }
}
