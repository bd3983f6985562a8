//! Graphics device implementations
//!
//! Windowed backends (OpenGL over a real context) live with the windowing
//! layer outside this crate; the headless backend ships here so the full
//! frame algorithm can run in tests and CI without a GPU.

pub mod headless;
