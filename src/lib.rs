//! Shelf application library
//!
//! The library catalog module plus the bootstrap that wires it into the
//! shelf module framework.

pub mod app;
pub mod modules;
pub mod utils;
