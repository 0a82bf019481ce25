//! Integration tests for the blocking-query cache.
//!
//! Every case drives a real `Cache` against a scripted fetcher.

mod cases_concurrent_test;
mod cases_error_handling_test;

pub mod support;
