//! Domain layer: identifiers, discovery rows and the namespace tree
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod classify;
pub mod error;
pub mod exclusion;
pub mod identifier;
pub mod namespace;
pub mod row;

pub use classify::{classify, Classification, ClassificationStats, Classified};
pub use error::{DomainError, DomainResult};
pub use exclusion::ExclusionFilter;
pub use identifier::Identifier;
pub use namespace::{MappingView, NamespaceNode, NamespaceTree, SELF_KEY};
pub use row::{collect_identifiers, collect_paths, parse_rows, PackageRow};
