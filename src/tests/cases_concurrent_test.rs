// Integration tests for coalescing and cancellation.

use std::sync::Arc;
use std::time::Duration;

use crate::error::Error;
use crate::model::{FetchResult, Value};
use crate::support::{ctx, new_cache, MockFetcher, ServiceDumpRequest};

const SERVICE_DUMP: &str = "service-dump";

/// Concurrent misses on one key share a single fetch and its result.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_gets_single_flight() {
    let cache = Arc::new(new_cache());
    let fetcher = Arc::new(MockFetcher::new());
    let shared = Value::new(vec![1u32, 2, 3]);
    fetcher.reply_after(Duration::from_millis(200), FetchResult::new(shared.clone(), 17));
    cache.register_type(SERVICE_DUMP, fetcher.clone()).unwrap();

    let mut handles = vec![];
    for _ in 0..16 {
        let cache = cache.clone();
        handles.push(tokio::spawn(async move {
            cache.get(&ctx(), SERVICE_DUMP, ServiceDumpRequest::new("web")).await
        }));
    }

    for result in futures::future::join_all(handles).await {
        let (value, meta) = result.unwrap().unwrap();
        assert!(value.ptr_eq(&shared));
        assert_eq!(meta.index, 17);
    }
    assert_eq!(fetcher.call_count(), 1);
}

/// Different keys do not coalesce.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_gets_different_keys() {
    let cache = Arc::new(new_cache());
    let fetcher = Arc::new(MockFetcher::new());
    for i in 0..4u64 {
        fetcher.reply_after(Duration::from_millis(50), FetchResult::new(Value::new(i), 10 + i));
    }
    cache.register_type(SERVICE_DUMP, fetcher.clone()).unwrap();

    let gets = (0..4).map(|i| {
        let cache = cache.clone();
        async move {
            cache
                .get(&ctx(), SERVICE_DUMP, ServiceDumpRequest::new(&format!("kind-{i}")))
                .await
        }
    });
    for result in futures::future::join_all(gets).await {
        assert!(result.is_ok());
    }
    assert_eq!(fetcher.call_count(), 4);
    assert_eq!(cache.len(), 4);
}

/// Canceling before anything was fetched yields a bare cancellation.
#[tokio::test]
async fn test_cancel_without_value() {
    let cache = new_cache();
    let fetcher = Arc::new(MockFetcher::new());
    fetcher.reply_after(Duration::from_millis(300), FetchResult::new(Value::new(1u8), 2));
    cache.register_type(SERVICE_DUMP, fetcher.clone()).unwrap();

    let caller = ctx();
    let canceler = caller.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        canceler.cancel();
    });

    let err = cache
        .get(&caller, SERVICE_DUMP, ServiceDumpRequest::new("web"))
        .await
        .unwrap_err();
    match err {
        Error::Canceled { stale, index } => {
            assert!(stale.is_none());
            assert_eq!(index, 0);
        }
        other => panic!("expected cancellation, got {other:?}"),
    }
}

/// Canceling a blocked read hands back the cached value alongside the error.
#[tokio::test]
async fn test_cancel_carries_stale_value() {
    let cache = new_cache();
    let fetcher = Arc::new(MockFetcher::new());
    cache.register_type(SERVICE_DUMP, fetcher.clone()).unwrap();

    let seeded = Value::new("cached".to_string());
    let key = ServiceDumpRequest::new("web").cache_key();
    cache.prepopulate(SERVICE_DUMP, FetchResult::new(seeded.clone(), 9), "dc1", "", &key).unwrap();

    let caller = ctx();
    caller.cancel();
    let err = cache
        .get(&caller, SERVICE_DUMP, ServiceDumpRequest::new("web").min_index(9))
        .await
        .unwrap_err();
    match err {
        Error::Canceled { stale: Some(value), index } => {
            assert!(value.ptr_eq(&seeded));
            assert_eq!(index, 9);
        }
        other => panic!("expected cancellation with stale value, got {other:?}"),
    }
}

/// A canceled caller detaches; the shared fetch still serves everyone else.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cancel_does_not_cancel_fetch() {
    let cache = Arc::new(new_cache());
    let fetcher = Arc::new(MockFetcher::new());
    let value = Value::new(5u16);
    fetcher.reply_after(Duration::from_millis(150), FetchResult::new(value.clone(), 30));
    cache.register_type(SERVICE_DUMP, fetcher.clone()).unwrap();

    let caller = ctx();
    let first = {
        let cache = cache.clone();
        let caller = caller.clone();
        tokio::spawn(async move { cache.get(&caller, SERVICE_DUMP, ServiceDumpRequest::new("web")).await })
    };
    tokio::time::sleep(Duration::from_millis(30)).await;
    caller.cancel();
    assert!(first.await.unwrap().unwrap_err().is_canceled());

    let (got, meta) = cache.get(&ctx(), SERVICE_DUMP, ServiceDumpRequest::new("web")).await.unwrap();
    assert!(got.ptr_eq(&value));
    assert_eq!(meta.index, 30);
    assert_eq!(fetcher.call_count(), 1, "the second caller must join the in-flight fetch");
}
