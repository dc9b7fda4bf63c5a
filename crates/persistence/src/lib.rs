//! Sicbo Persistence - In-memory storage for settled rounds
//!
//! Nothing here touches disk: history lives for the lifetime of the process.

pub mod history;

pub use history::{RollingHistory, DEFAULT_CAPACITY};
