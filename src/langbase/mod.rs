//! Langbase Pipes client.
//!
//! Transport for every completion call the inquiry pipeline makes. Each
//! prompt stage runs through its own pipe so token budgets can differ.

mod client;
mod types;


pub use client::*;
pub use types::*;
