mod classify;
pub use classify::{classify_cross, classify_referrer, CrossShape, ReferrerShape};

mod cross;
pub use cross::CrossRelationNames;

mod error;
pub use error::{CodegenError, Result};

mod expand;
pub use expand::{generate, Config, RelationFragments};

mod imports;
pub use imports::ImportRegistry;

mod names;
pub use names::NameResolver;

mod php;

mod signature;
pub use signature::{DefaultPolicy, SignatureBuilder};
