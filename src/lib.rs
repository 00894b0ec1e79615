//! Spatial memory and navigation aids for an agent that plays a tile-based
//! Pokémon game through an emulator.
//!
//! pokenav remembers where the agent has been, where healing worked, which
//! named places it bookmarked and how maps connect, and turns that memory into
//! short advisories and button sequences for the agent's next decision. It
//! also watches the agent's own turns for button loops and frozen screens and
//! proposes recovery moves.
//!
//! # Architecture
//!
//! - **Storage**: two SQLite files (coordinates, healing) opened per call, plus
//!   a JSON bookmark file rewritten atomically
//! - **Planning**: greedy Manhattan paths within a map, BFS over observed map
//!   connections between maps
//! - **Loop detection**: a bounded turn history scored with SSIM or pixel
//!   difference on grayscale frames
//! - **Transport**: MCP over stdio (primary) or streamable HTTP
//!
//! # Modules
//!
//! - [`config`]: configuration from TOML and environment variables
//! - [`db`]: SQLite open, schema, migrations and health checks
//! - [`error`]: business-level failures reported as `success: false`
//! - [`spatial`]: coordinate store, healing registry, bookmarks, planner
//! - [`navigation`]: turn history, frame similarity, loop enhancer

pub mod config;
pub mod db;
pub mod error;
pub mod navigation;
pub mod spatial;
