//! Core business logic for civica.

pub mod services;

pub use services::*;
