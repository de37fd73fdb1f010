pub mod cleaner;
pub mod config;
pub mod exclusions;
pub mod features;
pub mod loader;
pub mod output;
pub mod pipeline;
pub mod records;
pub mod stats;
