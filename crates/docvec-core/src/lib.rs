#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

pub mod config;
pub mod error;
pub mod lazy;
pub mod source;
pub mod state;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use state::CollectionState;
