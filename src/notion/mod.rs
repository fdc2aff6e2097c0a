//! Read-only access to the hosted workspace API: database queries, page
//! metadata and top-level block children.

pub mod blocks;
pub mod client;
pub mod schema;

pub use blocks::{Annotations, BlockKind, ContentBlock, RichText};
pub use client::{NotionClient, QueryResponse};
