pub mod chain;
pub mod geo;
pub mod id;
pub mod serde;
