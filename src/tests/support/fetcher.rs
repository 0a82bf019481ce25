// Scriptable fetcher that records every call.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::error::Error;
use crate::model::{FetchOptions, FetchResult, Fetcher, RegisterOptions, Request};

/// One recorded fetch.
#[derive(Debug, Clone)]
pub struct Call {
    pub opts: FetchOptions,
    pub at: Instant,
}

struct Step {
    delay: Duration,
    outcome: Result<FetchResult, String>,
}

/// MockFetcher replays scripted replies in order.
///
/// Once the script is exhausted it behaves like an idle blocking query: it
/// waits out `max_wait` and reports not-modified when allowed, or never
/// answers otherwise.
pub struct MockFetcher {
    opts: RegisterOptions,
    shape: Option<(fn(&dyn Request) -> bool, &'static str)>,
    strict: bool,
    script: Mutex<VecDeque<Step>>,
    calls: Mutex<Vec<Call>>,
    count: AtomicUsize,
}

fn is<R: Request>(req: &dyn Request) -> bool {
    req.as_any().is::<R>()
}

impl MockFetcher {
    pub fn new() -> Self {
        Self {
            opts: RegisterOptions::default(),
            shape: None,
            strict: false,
            script: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            count: AtomicUsize::new(0),
        }
    }

    pub fn with_options(mut self, opts: RegisterOptions) -> Self {
        self.opts = opts;
        self
    }

    /// Rejects, from inside `fetch`, requests that are not an `R`.
    pub fn expect<R: Request>(mut self) -> Self {
        self.shape = Some((is::<R>, std::any::type_name::<R>()));
        self
    }

    /// Also rejects foreign requests before any fetch happens.
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    pub fn reply(&self, res: FetchResult) {
        self.reply_after(Duration::ZERO, res);
    }

    pub fn reply_after(&self, delay: Duration, res: FetchResult) {
        self.script.lock().push_back(Step { delay, outcome: Ok(res) });
    }

    pub fn fail(&self, msg: &str) {
        self.script.lock().push_back(Step {
            delay: Duration::ZERO,
            outcome: Err(msg.to_string()),
        });
    }

    pub fn call_count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }
}

#[async_trait::async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, opts: FetchOptions, req: Arc<dyn Request>) -> anyhow::Result<FetchResult> {
        self.calls.lock().push(Call { opts: opts.clone(), at: Instant::now() });
        self.count.fetch_add(1, Ordering::SeqCst);

        if let Some((matches, name)) = self.shape {
            if !matches(req.as_ref()) {
                return Err(Error::WrongRequestType(name.to_string()).into());
            }
        }

        let step = self.script.lock().pop_front();
        match step {
            Some(step) => {
                if !step.delay.is_zero() {
                    tokio::time::sleep(step.delay).await;
                }
                step.outcome.map_err(|msg| anyhow::anyhow!(msg))
            }
            None => {
                tokio::time::sleep(opts.max_wait).await;
                if opts.allow_not_modified {
                    Ok(FetchResult::not_modified(opts.min_index))
                } else {
                    std::future::pending().await
                }
            }
        }
    }

    fn accepts(&self, req: &dyn Request) -> bool {
        match self.shape {
            Some((matches, _)) if self.strict => matches(req),
            _ => true,
        }
    }

    fn options(&self) -> RegisterOptions {
        self.opts.clone()
    }
}
