//! Token logo service: resolves blockchain token logos through a prioritized
//! chain of providers, keeps them in a sandboxed object store, and serves
//! them over HTTP.

pub mod assets;
pub mod config;
pub mod errors;
pub mod models;
pub mod providers;
pub mod registry;
pub mod storage;
pub mod sync;
pub mod utils;
pub mod web;
