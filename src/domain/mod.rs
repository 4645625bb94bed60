// Domain layer: models and ports. Adapters and core depend on this, never the other way round.

pub mod model;
pub mod ports;
