//! Shared test fixtures for RandForge crates.
//!
//! - [`hierarchy`] - a named root component for building hierarchies
//! - [`bounded`] - single-variable aggregates (int and float)
//! - [`pair`] - two related bytes with an ordering constraint
//! - [`packet`] - packed headers, payloads and a shared configuration
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! randforge-test = { workspace = true }
//! ```

pub mod bounded;
pub mod hierarchy;
pub mod packet;
pub mod pair;

pub use bounded::{Bounded, FloatEnv};
pub use hierarchy::Env;
pub use packet::{Config, Packet, PacketHeader};
pub use pair::Pair;
