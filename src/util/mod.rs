//! Small shared utilities.

pub mod decrypt;
