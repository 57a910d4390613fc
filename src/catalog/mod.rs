//! Cataloguing service integration

pub mod client;

pub use client::HttpCatalogClient;
