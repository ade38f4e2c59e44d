//! In-memory virtual filesystem.
//!
//! The tree is loaded once from a static description and then mutated in
//! place. Nodes live in an arena addressed by `NodeId` handles: directories
//! hold the handles of their children and every node holds the handle of its
//! parent.

mod loader;
mod node;
mod path;
mod tree;

pub use loader::VfsLoadError;
pub use node::{InvalidModeError, Permissions};
pub use tree::{EntryKind, Vfs};
