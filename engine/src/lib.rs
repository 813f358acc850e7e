//! Library surface of the hotel AC control plane: C1-C7 (`clock`, `room`,
//! `billing`, `thermal`, `scheduler`, `engine`, the command API on
//! [`engine::Engine`]) plus the ambient concerns a runnable service in this
//! corpus always carries -- configuration, the ticker, and the
//! newline-delimited-JSON binding layer.
//!
//! `main.rs` is a thin composition root over this crate: parse config, build
//! an [`engine::Engine`], spawn the ticker, serve the binding layer until
//! shutdown.

pub mod billing;
pub mod binding;
pub mod clock;
pub mod config;
pub mod engine;
pub mod errors;
pub mod room;
pub mod scheduler;
pub mod thermal;
pub mod ticker;
