//! OracleNet identity core
//!
//! Library surface for the identity server: signature verification, typed
//! challenge/record stores, the Merkle batch engine, GitHub proof fetching,
//! account resolution, and the HTTP handlers tying them together.

pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod services;
pub mod store;
