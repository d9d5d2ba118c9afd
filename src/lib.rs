//! # taskboard-client
//!
//! Headless core of the taskboard single-page client. Owns the pieces with
//! real invariants: the session state machine, the HTTP request layer
//! (credentials, response caching, cancellation, uniform error
//! notification), and the client-side decryption helper for the encrypted
//! email field.
//!
//! Rendering, routing, and the backend API are external collaborators. UI
//! layers observe the session through [`state::session::Session::subscribe`]
//! and drive auth and task operations through the service handles.

pub mod config;
pub mod net;
pub mod notify;
pub mod services;
pub mod state;
pub mod util;
