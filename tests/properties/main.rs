//! Property tests.

mod progress_props;
mod retry_props;
mod session_props;
