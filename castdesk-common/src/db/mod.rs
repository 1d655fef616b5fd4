//! Database initialization and profile persistence

pub mod init;
pub mod profiles;

pub use init::*;
pub use profiles::*;
