//! Core types, ports and error taxonomy for the Unified Vector Store.
//!
//! This crate has no knowledge of any concrete provider, embedding model or
//! HTTP surface — it is the shared vocabulary the rest of the workspace
//! builds on, the analogue of a Clean-Architecture domain layer.

pub mod constants;
pub mod error;
pub mod normalize;
pub mod ports;
pub mod value_objects;

pub use error::{Error, Result};
