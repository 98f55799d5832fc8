//! Type resolution tests through the public API.

pub mod tests_resolution;
