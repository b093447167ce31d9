//! Behavioural scenarios for scaling and status reporting.

#[path = "common/test_constants.rs"]
mod test_constants;

mod scale;
