// Domain layer - Clip model, transcode rules and domain errors

pub mod errors;
pub mod model;
pub mod rules;
