//! Integration tests, compiled into a single binary.
//!
//! One module per area; `helpers` holds the fixture domain and provider doubles.

mod config;
mod data;
mod helpers;
mod provider;
mod search;
