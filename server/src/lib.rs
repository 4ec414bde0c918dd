//! # Classic Server Library
//!
//! This library implements the server side of the classic block-building
//! protocol: a TCP listener that gives every connection its own session
//! task, and the session engine that logs players in, streams them the map
//! and referees what they do in the world.
//!
//! ## Core Responsibilities
//!
//! ### Login
//! A connecting client sends its name and a verification token. The token
//! must be the MD5 of the server salt and the name. Banned names and
//! addresses are turned away before the player is registered.
//!
//! ### Map Transfer
//! Once registered, the player receives the whole block array, gzipped and
//! split into 1024-byte chunks, then is placed at the spawn point.
//!
//! ### Refereeing
//! Movement, block changes and chat are validated as they arrive:
//! - Movement packet floods and implausible jumps snap the player back
//! - Block changes out of reach, too fast, or involving restricted blocks
//!   get the player kicked
//! - Chat floods get the player kicked
//!
//! ## Architecture Design
//!
//! ### One Task Per Session
//! Each connection is served by one tokio task that owns the socket.
//! Other tasks reach it through a [`SessionHandle`](session::SessionHandle),
//! which queues packets on the session's outbound queue and can kick it.
//!
//! ### Shared State Behind Traits
//! The map, player registry, ban and operator lists, and the command
//! dispatcher are passed in through [`ServerContext`] as trait objects with
//! their own locking. Sessions never hold global state of their own.
//!
//! ## Module Organization
//!
//! - `session` - login, map transfer, the steady-state loop and handlers
//! - `outbound` - the per-session packet queue
//! - `antispam` - sliding-window and speed-hack detectors
//! - `player_registry` - the [`SessionDirectory`](player_registry::SessionDirectory) of logged-in players
//! - `access_lists` - ban and operator lists
//! - `world` - the block grid
//! - `commands` - chat command dispatch
//! - `network` - the accept loop and shutdown
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::Config;
//! use server::network::Server;
//! use server::ServerContext;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let ctx = Arc::new(ServerContext::from_config(Config::default())?);
//!     let server = Server::bind(ctx).await?;
//!
//!     tokio::select! {
//!         result = server.run() => result?,
//!         _ = tokio::signal::ctrl_c() => {}
//!     }
//!     server.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod access_lists;
pub mod antispam;
pub mod commands;
pub mod config;
mod context;
pub mod error;
pub mod network;
pub mod outbound;
pub mod player_registry;
pub mod session;
pub mod world;

pub use context::ServerContext;
