pub mod connection;
pub mod fee_store;
pub mod memory_store;
pub mod migrations;

pub use connection::*;
pub use fee_store::*;
pub use memory_store::*;
pub use migrations::*;
