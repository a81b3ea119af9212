#![allow(dead_code)]

mod proxy;
mod workspace;

pub use proxy::FileProxy;
pub use workspace::GoWorkspace;
