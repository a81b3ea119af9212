pub mod atomic;
pub mod config;
pub mod env;
pub mod imports;
pub mod parser;
pub mod version;
