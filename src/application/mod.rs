// src/application/mod.rs
//
// Application Layer - the surface embedding programs use

pub mod state;

pub use state::HotspotCore;
