//! Shared client-side state.
//!
//! DESIGN
//! ======
//! The session is the only state with real invariants in this slice, so it
//! gets its own module; consumers observe it through a watch channel
//! rather than reaching into fields.

pub mod session;
