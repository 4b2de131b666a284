// Domain layer: audio/voice models and the ports the adapters implement.

pub mod model;
pub mod ports;
