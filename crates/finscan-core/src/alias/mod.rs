//! Business-name alias store and resolution.

pub mod registry;
pub mod resolver;
pub mod similarity;
pub mod store;

pub use registry::AliasRegistry;
pub use resolver::{resolve, resolve_detailed, AliasMatch, MatchKind};
pub use store::AliasStore;
