//! PlanPilot: a multi-user kanban board.
//!
//! The [`board`] module is the REST server, [`client`] the HTTP client and
//! optimistic sync layer, and [`ui`] the terminal rendering the CLI uses.
//! The task model and position reconciler live in `planpilot-common`.

pub mod board;
pub mod client;
pub mod config;
pub mod errors;
pub mod ui;
