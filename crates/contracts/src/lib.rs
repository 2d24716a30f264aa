//! # Contracts
//!
//! Frozen interface contracts shared by every crate in the workspace:
//! argument lists, handler traits, errors and configuration structures.
//! Business crates depend on this crate; reverse dependencies are prohibited.
//!
//! ## Call Model
//! - Arguments travel as `serde_json::Value`s and are decoded per handler
//! - Arity and types are checked when a handler is called, not when it subscribes

mod args;
mod blueprint;
mod dispatcher_config;
mod error;
mod handler;

pub use args::Args;
#[doc(hidden)]
pub use args::__private;
pub use blueprint::*;
pub use dispatcher_config::*;
pub use error::*;
pub use handler::{Callback, Handler, HandlerOutput, IntoCallback, TypedFn};
