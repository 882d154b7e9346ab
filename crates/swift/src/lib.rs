//! swiftfs-swift: OpenStack Swift adapter for swiftfs
//!
//! This crate provides the implementation of the BackingStore trait
//! over the Swift REST API using reqwest. It is the only crate that
//! speaks HTTP.

pub mod client;

pub use client::SwiftClient;
