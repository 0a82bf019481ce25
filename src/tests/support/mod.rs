// Shared test support code for integration tests.
// This module provides common utilities that all test files can use.

pub mod cache;
pub mod fetcher;
pub mod requests;

pub use cache::{ctx, new_cache, wait_until};
pub use fetcher::{Call, MockFetcher};
pub use requests::{CatalogServicesRequest, ServiceDumpRequest, ServiceNode};
