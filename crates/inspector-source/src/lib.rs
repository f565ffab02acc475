//! inspector-source — access to the colony registry.
//!
//! The crawler only sees the [`ColonySource`] trait. [`HttpColonySource`]
//! is the production adapter: it talks HTTP/1.1 JSON to a registry gateway.
//!
//! # Gateway protocol
//!
//! ```text
//! GET /colonies/count   → {"count": n}
//! GET /skills/count     → {"count": n}
//! GET /colonies/{id}    → {"domainCount": d, "taskCount": t}   (404 if unknown)
//! ```

pub mod error;
pub mod gateway;
pub mod source;

pub use error::{SourceError, SourceResult};
pub use gateway::HttpColonySource;
pub use source::{ColonyHandle, ColonyId, ColonySource};
