//! Solana Documentation MCP Service
//!
//! This crate provides a Model Context Protocol (MCP) service for reading and
//! searching the Solana documentation. It fetches pages from the docs site and
//! from the `solana_sdk` API reference on docs.rs and returns their text.
//!
//! # Features
//!
//! - Fetch a documentation section by path
//! - Search every page linked from the docs navigation
//! - Look up API reference items
//! - stdio and SSE transports
//!
//! # Modules
//!
//! - [`fetcher`]: HTTP page fetching
//! - [`docs_parser`]: Title and body extraction from markup
//! - [`nav`]: Navigation link enumeration
//! - [`search`]: Concurrent search across navigation pages
//! - [`mcp`]: MCP server implementation and protocol handling
//! - [`server`]: Transport startup and shutdown

pub mod docs_parser;
pub mod fetcher;
pub mod mcp;
pub mod nav;
pub mod search;
pub mod server;

#[cfg(test)]
mod testing;
