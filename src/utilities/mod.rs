//! Helpers shared by the library and the client binary.

pub mod paths;
pub mod printer;
