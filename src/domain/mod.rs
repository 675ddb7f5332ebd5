// Domain layer: core models and ports (interfaces) shared by adapters and the sync core.

pub mod model;
pub mod ports;
