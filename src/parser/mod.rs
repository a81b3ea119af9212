//! Parser layer
//! - error.rs: ParseError definition
//! - go_mod.rs: go.mod parser (module, require, retract directives)

pub mod error;
pub mod go_mod;

pub use error::ParseError;
pub use go_mod::{GoModParser, ModFile, Requirement, replace_module_path};
