//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CrawlState`: frontier queue, visited set, written-path set and auxiliary set
//! - `QueuedUrl`: a resource waiting in the frontier or auxiliary set
//! - `FetchOutcome`: the tagged result of one fetch attempt

mod crawl_state;
mod outcome;

// Re-export main types
pub use crawl_state::{CrawlState, QueuedUrl};
pub use outcome::FetchOutcome;
