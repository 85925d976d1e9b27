// Domain layer: request model and ports. Adapters live under crate::adapters.

pub mod model;
pub mod ports;
