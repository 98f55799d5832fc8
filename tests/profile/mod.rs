//! Rank profile compilation tests.

pub mod tests_compile;
