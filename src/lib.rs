//! ani-tui: a terminal client for searching, browsing and streaming
//! anime from a remote catalog.
//!
//! The binary in `main.rs` wires the pieces together; everything is
//! exposed here so integration tests can drive the data layer directly.

pub mod api;
pub mod app;
pub mod config;
pub mod download;
pub mod error;
pub mod history;
pub mod keys;
pub mod loading;
pub mod menu;
pub mod player;
pub mod types;
pub mod ui;
