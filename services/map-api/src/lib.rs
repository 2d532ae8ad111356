//! Map API Service Library
//!
//! This crate provides the HTTP server implementation for the
//! disaster-information map data backend.

pub mod config;
pub mod handlers;
pub mod lightning;
pub mod state;
