//! Storage layer: page-granular disk I/O.

mod metadata;
mod pager;

pub use metadata::TreeMetadata;
pub use pager::Pager;
