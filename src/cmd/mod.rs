//! CLI command implementations.
//!
//! Each submodule owns one or more related `Commands` variants:
//!
//! | Module   | Commands handled                          |
//! |----------|-------------------------------------------|
//! | `server` | `Serve`, `InitDb`                         |
//! | `auth`   | `Signup`, `Login`, `Logout`               |
//! | `tasks`  | `List`, `Add`, `Edit`, `Move`, `Delete`   |

pub mod auth;
pub mod server;
pub mod tasks;

pub use auth::{cmd_login, cmd_logout, cmd_signup};
pub use server::{cmd_init_db, cmd_serve};
pub use tasks::{cmd_add, cmd_delete, cmd_edit, cmd_list, cmd_move};
