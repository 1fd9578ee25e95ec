//! Real-time collaboration coordinator library.
//! This crate exposes internal modules for integration testing and for
//! embedding the coordinator with custom provider implementations.
//! The binary entry point is in main.rs.

pub mod activity;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod presence;
pub mod protocol;
pub mod providers;
pub mod relay;
pub mod rooms;
pub mod routes;
pub mod state;
pub mod ws;
