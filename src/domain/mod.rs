// Domain layer: option types and ports. No HTTP calls happen here.

pub mod model;
pub mod ports;
