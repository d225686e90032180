//! Client-side controller for the SQL agent chat UI.
//!
//! The browser front end lives in `frontend/`; the console front end is the
//! `sqlagent-ui` binary. Both drive the same [`controller::Controller`].

pub mod api;
pub mod config;
pub mod console;
pub mod controller;
pub mod error;
#[cfg(feature = "native")]
pub mod http;
pub mod models;
pub mod render;
pub mod state;
