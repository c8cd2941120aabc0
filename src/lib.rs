pub mod config;
pub mod dhcp;
pub mod error;
pub mod net;
pub mod sim;
pub mod topo;
pub mod traffic;

pub use error::{Error, ErrorKind, Result};

#[cfg(test)]
mod test;
