//! Model feature conversion tests.

pub mod tests_conversion;
#[cfg(feature = "model-store")]
pub mod tests_store;
