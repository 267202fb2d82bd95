//! Terminal output helpers

pub mod terminal;

pub use terminal::{colors, colors_enabled, colorize, error, success, warning, RESET};
