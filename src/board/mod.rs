//! Board server: authenticated REST back-end for the kanban board.
//!
//! ## Overview
//!
//! Users sign up and log in to receive a bearer token; every task route is
//! scoped to the caller. Tasks live in SQLite and carry the status/position
//! pair the client's reconciler computes. The server stores what it is told
//! and never reorders siblings on its own.
//!
//! ## Module Map
//!
//! ```text
//! ┌──────────┐   HTTP   ┌──────────────────────────────────────────────────┐
//! │  Client  │ ───────> │  server.rs  (axum Router, ServerConfig)          │
//! │  (CLI /  │ <─────── │    └─ api.rs  (route handlers, AppState)         │
//! │   SPA)   │          │         │                                        │
//! └──────────┘          │         │ AuthUser extractor (bearer token)      │
//!                       │         v                                        │
//!                       │  auth.rs   (argon2 hashes, HS256 tokens)         │
//!                       │         │                                        │
//!                       │         │ DbHandle::call() on blocking pool      │
//!                       │         v                                        │
//!                       │  db.rs     (BoardDb, users + tasks tables)       │
//!                       └──────────────────────────────────────────────────┘
//! ```
//!
//! ## Supporting Modules
//!
//! | Module   | Responsibility                                              |
//! |----------|-------------------------------------------------------------|
//! | `models` | Request/response payloads, `User`, input validation         |

pub mod api;
pub mod auth;
pub mod db;
pub mod models;
pub mod server;

pub use server::{ServerConfig, start_server};
