// Adapters layer: concrete implementations of the gateway port.

pub mod memory;
pub mod rest;

pub use memory::MemoryGateway;
pub use rest::RestGateway;
