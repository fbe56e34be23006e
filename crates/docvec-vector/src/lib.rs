//! LanceDB implementations of the vector capabilities.
//!
//! Each collection maps to one table; see [`schema`] for its layout.

pub mod schema;
pub mod state;
pub mod store;
pub mod table;

pub use state::LanceStateStore;
pub use store::LanceVectorStore;
