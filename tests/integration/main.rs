//! Integration tests against a mocked minting engine.

mod api_tests;
mod engine_tests;
mod fixture;
mod session_tests;
mod workflow_tests;
