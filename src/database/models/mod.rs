pub mod journey;
pub mod location;
