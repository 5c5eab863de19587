//! Lobby session client.
//!
//! SYSTEM CONTEXT
//! ==============
//! This crate is the front-end's brain without the front-end: it tracks
//! which screen is active and which lobby/player the session represents,
//! reconciling that against server pushes and user actions. Hosts (a
//! browser shell, the terminal client) feed it input and carry out the
//! [`Effect`]s it returns.

pub mod effect;
pub mod error;
pub mod route;
pub mod session;

pub use effect::{Effect, Notice, NoticeKind};
pub use error::ValidationError;
pub use route::Route;
pub use session::{Phase, Screen, Session};
