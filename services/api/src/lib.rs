//! Shewit API Library Crate
//!
//! This library contains the web service around `shewit-core`: configuration,
//! the in-memory session store, REST handlers, the WebSocket push channel and
//! routing. The `api` binary is a thin wrapper around this library.

pub mod config;
pub mod handlers;
pub mod models;
pub mod router;
pub mod sessions;
pub mod state;
pub mod ws;
