//! The managed proxy stack: TLS bootstrap, config rendering and child
//! process supervision for the pooler and proxy binaries.

pub mod process;
pub mod render;
mod stack;
pub mod tls;

pub use stack::{LocalProxyStack, ProxyStack, StackError};
