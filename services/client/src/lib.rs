//! services/client/src/lib.rs
//!
//! Client for a personal genealogy API: HTTP and storage adapters, the credential and
//! record stores, and headless view models driven by the `family-tree` binary.

pub mod adapters;
pub mod config;
pub mod error;
pub mod stores;
pub mod ui;
