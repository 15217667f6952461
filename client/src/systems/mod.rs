//! Client-side game systems
//!
//! Organized into submodules for maintainability.

mod particles;
mod player;
mod rendering;
mod session;
mod world;

// Re-export everything for easy access from main.rs
pub use particles::*;
pub use player::*;
pub use rendering::*;
pub use session::*;
pub use world::*;
