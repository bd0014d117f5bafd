pub mod collector;
pub mod config;
pub mod dedup;
pub mod digest;
pub mod error;
pub mod global;
pub mod notifier;
pub mod render;
pub mod rewriter;
pub mod scheduler;
pub mod trends;
pub mod types;
pub mod util;
