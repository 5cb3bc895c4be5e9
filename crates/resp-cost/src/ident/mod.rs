mod alphabet;
mod cache;
mod generator;
mod uniqueness;

pub use alphabet::*;
pub use cache::*;
pub use generator::*;
pub use uniqueness::*;
