//! pyroterm: a real-time fireworks show for the terminal.
//!
//! The engine simulates shells that launch, burst into procedurally
//! generated star patterns, and burn out, rendered with true-color half
//! blocks. The binary in `main.rs` wires the engine to a terminal; the
//! modules here are the simulation and are fully testable headless.

pub mod color;
pub mod config;
pub mod shell;
pub mod shells;
pub mod show;
pub mod spark;
pub mod store;
pub mod surface;
