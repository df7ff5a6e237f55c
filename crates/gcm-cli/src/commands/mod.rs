pub mod cache;
pub mod completions;
pub mod config;
pub mod sat;
pub mod scenario;
pub mod util;
