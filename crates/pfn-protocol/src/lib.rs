//! PFN Protocol - Package envelope and record contract
//!
//! Defines the unit of exchange between processor nodes: a [`Package`]
//! tagged Control or Data, carrying a text payload (the raw wire body)
//! and/or a decoded record implementing [`DataItem`].

pub mod constants;
pub mod error;
pub mod item;
pub mod package;

pub use constants::*;
pub use error::*;
pub use item::*;
pub use package::*;
