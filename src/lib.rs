//! RUGSCREEN: DEX token screening agent
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod error;
pub mod activity;
pub mod normalize;
pub mod clients;
pub mod storage;
pub mod engine;
pub mod api;
