// Integration tests for the error taxonomy.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::Error;
use crate::model::{FetchResult, Value};
use crate::support::{ctx, new_cache, CatalogServicesRequest, MockFetcher, ServiceDumpRequest};

const SERVICE_DUMP: &str = "service-dump";
const CATALOG_SERVICES: &str = "catalog-services";

#[tokio::test]
async fn test_unregistered_type() {
    let cache = new_cache();
    let err = cache
        .get(&ctx(), "nope", ServiceDumpRequest::new("web"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UnregisteredType(ref name) if name == "nope"));
    assert!(cache.is_empty(), "no entry for unknown types");
}

#[tokio::test]
async fn test_duplicate_registration_is_rejected() {
    let cache = new_cache();
    cache.register_type(SERVICE_DUMP, Arc::new(MockFetcher::new())).unwrap();
    let err = cache
        .register_type(SERVICE_DUMP, Arc::new(MockFetcher::new()))
        .unwrap_err();
    assert!(matches!(err, Error::DuplicateType(_)));
}

/// A fetcher that checks shapes up front rejects foreign requests without fetching.
#[tokio::test]
async fn test_wrong_request_type_rejected_up_front() {
    let cache = new_cache();
    let fetcher = Arc::new(MockFetcher::new().expect::<CatalogServicesRequest>().strict());
    cache.register_type(CATALOG_SERVICES, fetcher.clone()).unwrap();

    let err = cache
        .get(&ctx(), CATALOG_SERVICES, ServiceDumpRequest::new("web"))
        .await
        .unwrap_err();
    assert!(err.is_wrong_type());
    assert!(err.to_string().contains("wrong type"));
    assert_eq!(fetcher.call_count(), 0);
}

/// A fetcher that discovers the mismatch itself surfaces the same kind.
#[tokio::test]
async fn test_wrong_request_type_from_fetch() {
    let cache = new_cache();
    let fetcher = Arc::new(MockFetcher::new().expect::<CatalogServicesRequest>());
    cache.register_type(CATALOG_SERVICES, fetcher.clone()).unwrap();

    let err = cache
        .get(&ctx(), CATALOG_SERVICES, ServiceDumpRequest::new("web"))
        .await
        .unwrap_err();
    assert!(err.is_wrong_type(), "got {err:?}");
    assert!(err.to_string().contains("wrong type"));
    assert_eq!(fetcher.call_count(), 1);
}

/// A failed fetch is reported after one attempt instead of retried until the wait bound.
#[tokio::test]
async fn test_fetch_error_returned_after_one_attempt() {
    let cache = new_cache();
    let fetcher = Arc::new(MockFetcher::new());
    fetcher.fail("rpc error: no leader");
    cache.register_type(SERVICE_DUMP, fetcher.clone()).unwrap();

    let started = Instant::now();
    let req = ServiceDumpRequest::new("web").max_wait(Duration::from_secs(5));
    let err = cache.get(&ctx(), SERVICE_DUMP, req).await.unwrap_err();
    assert!(matches!(err, Error::FetchFailed(_)));
    assert!(err.to_string().contains("no leader"));
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(fetcher.call_count(), 1);
}

/// Errors never invalidate what is cached.
#[tokio::test]
async fn test_fetch_error_keeps_cached_value() {
    let cache = new_cache();
    let fetcher = Arc::new(MockFetcher::new());
    cache.register_type(SERVICE_DUMP, fetcher.clone()).unwrap();

    let seeded = Value::new("good".to_string());
    let key = ServiceDumpRequest::new("web").cache_key();
    cache.prepopulate(SERVICE_DUMP, FetchResult::new(seeded.clone(), 5), "dc1", "", &key).unwrap();
    fetcher.fail("connection refused");

    let err = cache
        .get(&ctx(), SERVICE_DUMP, ServiceDumpRequest::new("web").min_index(5))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::FetchFailed(_)));

    let (value, meta) = cache.get(&ctx(), SERVICE_DUMP, ServiceDumpRequest::new("web")).await.unwrap();
    assert!(value.ptr_eq(&seeded));
    assert_eq!(meta.index, 5);
    assert!(meta.hit);
}

/// The wait bound with nothing ever fetched is a timeout, not a zero value.
#[tokio::test]
async fn test_timeout_without_value() {
    let cache = new_cache();
    let fetcher = Arc::new(MockFetcher::new());
    cache.register_type(SERVICE_DUMP, fetcher.clone()).unwrap();

    let req = ServiceDumpRequest::new("web").max_wait(Duration::from_millis(100));
    let err = cache.get(&ctx(), SERVICE_DUMP, req).await.unwrap_err();
    assert!(matches!(err, Error::Timeout(d) if d == Duration::from_millis(100)));
}

#[tokio::test]
async fn test_prepopulate_errors() {
    let cache = new_cache();
    cache.register_type(SERVICE_DUMP, Arc::new(MockFetcher::new())).unwrap();

    let err = cache
        .prepopulate("nope", FetchResult::new(Value::new(()), 1), "dc1", "", "k")
        .unwrap_err();
    assert!(matches!(err, Error::UnregisteredType(_)));

    let err = cache
        .prepopulate(SERVICE_DUMP, FetchResult::not_modified(3), "dc1", "", "k")
        .unwrap_err();
    assert!(matches!(err, Error::EmptyValue));

    cache
        .prepopulate(SERVICE_DUMP, FetchResult::new(Value::new(()), 42), "dc1", "", "k")
        .unwrap();
    let err = cache
        .prepopulate(SERVICE_DUMP, FetchResult::new(Value::new(()), 41), "dc1", "", "k")
        .unwrap_err();
    assert!(matches!(err, Error::Regression { current: 42, offered: 41 }));
}
