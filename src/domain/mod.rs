// Domain layer: records and the gateway port. No knowledge of HTTP or stores.

pub mod model;
pub mod ports;
