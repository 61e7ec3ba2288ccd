//! Unit test suite entry point.

mod config_tests;
mod error_classification_tests;
