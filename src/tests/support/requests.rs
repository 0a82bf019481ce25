// Sample request types.

use std::any::Any;
use std::time::Duration;

use serde::Serialize;

use crate::model::{hash_key, Request, RequestInfo};

/// A node entry returned by the sample fetchers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceNode {
    pub service: String,
}

/// Dump of every service of one kind.
#[derive(Debug, Clone, Default)]
pub struct ServiceDumpRequest {
    pub datacenter: String,
    pub service_kind: String,
    pub token: String,
    pub min_index: u64,
    pub max_wait: Duration,
    pub max_age: Duration,
    pub must_revalidate: bool,
}

impl ServiceDumpRequest {
    pub fn new(kind: &str) -> Self {
        Self {
            datacenter: "dc1".to_string(),
            service_kind: kind.to_string(),
            ..Self::default()
        }
    }

    pub fn min_index(mut self, index: u64) -> Self {
        self.min_index = index;
        self
    }

    pub fn max_wait(mut self, wait: Duration) -> Self {
        self.max_wait = wait;
        self
    }

    /// The key this request is cached under, for prepopulate.
    pub fn cache_key(&self) -> String {
        self.cache_info().key
    }
}

impl Request for ServiceDumpRequest {
    fn cache_info(&self) -> RequestInfo {
        #[derive(Serialize)]
        struct Key<'a> {
            kind: &'a str,
        }

        RequestInfo {
            key: hash_key(&Key { kind: &self.service_kind }),
            datacenter: self.datacenter.clone(),
            token: self.token.clone(),
            min_index: self.min_index,
            max_wait: self.max_wait,
            allow_stale: true,
            allow_not_modified: true,
            max_age: self.max_age,
            must_revalidate: self.must_revalidate,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Listing of catalog services.
#[derive(Debug, Clone, Default)]
pub struct CatalogServicesRequest {
    pub datacenter: String,
    pub filter: String,
    pub min_index: u64,
    pub max_wait: Duration,
}

impl Request for CatalogServicesRequest {
    fn cache_info(&self) -> RequestInfo {
        RequestInfo {
            key: hash_key(&("catalog", &self.filter)),
            datacenter: self.datacenter.clone(),
            min_index: self.min_index,
            max_wait: self.max_wait,
            ..RequestInfo::default()
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
