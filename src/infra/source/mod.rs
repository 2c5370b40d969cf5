//! `BeyonderSource` adapters.

mod memory;
mod yaml;

pub use memory::{BeyonderFixture, CallCounts, InMemorySource};
pub use yaml::YamlDirectorySource;
