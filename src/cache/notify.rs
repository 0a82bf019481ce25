//! Continuous change notifications.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::Error;
use crate::model::{Request, RequestInfo, ResultMeta, Value};

use super::cache::{Cache, Inner};
use super::types::RegisteredType;

/// One notification pushed by [`Cache::notify`].
#[derive(Debug, Clone)]
pub struct UpdateEvent {
    /// Caller supplied tag to tell watches apart on a shared channel.
    pub correlation_id: String,
    pub result: Result<(Value, ResultMeta), Error>,
}

impl Cache {
    /// Watches `req` and sends an [`UpdateEvent`] each time its value changes.
    ///
    /// Blocking types are followed with index-based long polls. Polling types
    /// are re-read every `max_age`, which the request must therefore carry.
    /// The watch ends when `ctx` is canceled, the receiver is dropped, or the
    /// cache shuts down.
    pub fn notify<R: Request>(
        &self,
        ctx: CancellationToken,
        type_name: &str,
        req: R,
        correlation_id: impl Into<String>,
        ch: mpsc::Sender<UpdateEvent>,
    ) -> Result<(), Error> {
        let inner = self.inner().clone();
        let tentry = inner.registered(type_name)?;
        if !tentry.fetcher.accepts(&req) {
            return Err(Error::WrongRequestType(std::any::type_name::<R>().to_string()));
        }
        let info = req.cache_info();
        if !tentry.opts.supports_blocking && info.max_age.is_zero() {
            return Err(Error::NotifyRequiresMaxAge(type_name.to_string()));
        }

        let watch = Watch {
            ctx,
            tentry,
            req: Arc::new(req),
            info,
            correlation_id: correlation_id.into(),
            ch,
        };
        let task_inner = inner.clone();
        inner.tracker.spawn(async move {
            if watch.tentry.opts.supports_blocking {
                task_inner.notify_blocking(&watch).await;
            } else {
                task_inner.notify_polling(&watch).await;
            }
            debug!(
                component = "notify",
                event = "stopped",
                correlation_id = %watch.correlation_id,
                "watch stopped"
            );
        });
        Ok(())
    }
}

struct Watch {
    ctx: CancellationToken,
    tentry: Arc<RegisteredType>,
    req: Arc<dyn Request>,
    info: RequestInfo,
    correlation_id: String,
    ch: mpsc::Sender<UpdateEvent>,
}

impl Watch {
    /// Sends one event. Returns false when the watch should end.
    async fn send(&self, result: Result<(Value, ResultMeta), Error>) -> bool {
        let event = UpdateEvent {
            correlation_id: self.correlation_id.clone(),
            result,
        };
        tokio::select! {
            _ = self.ctx.cancelled() => false,
            sent = self.ch.send(event) => sent.is_ok(),
        }
    }

    fn at_index(&self, index: u64) -> RequestInfo {
        RequestInfo {
            min_index: index,
            ..self.info.clone()
        }
    }
}

impl Inner {
    async fn notify_blocking(self: &Arc<Self>, w: &Watch) {
        let mut index = 0;
        let mut failures: u32 = 0;
        // The last event sent was an error.
        let mut erroring = false;
        loop {
            if w.ctx.is_cancelled() {
                return;
            }
            let result = self
                .get_with_index(&w.ctx, w.tentry.clone(), w.req.clone(), w.at_index(index))
                .await;
            if matches!(&result, Err(err) if err.is_canceled()) {
                return;
            }

            let fetched = result.as_ref().ok().map(|(_, meta)| meta.index);
            let healthy = fetched.is_some_and(|i| i > 0);
            // A lower index means the source reset; follow it down.
            let changed = match fetched {
                Some(new) => index == 0 || new != index || erroring,
                None => !erroring,
            };
            if let Some(new) = fetched {
                index = new;
            }
            erroring = fetched.is_none();
            if changed && !w.send(result).await {
                return;
            }

            if healthy {
                failures = 0;
                continue;
            }
            failures = failures.saturating_add(1);
            if !self.pause(w, self.backoff.wait(failures)).await {
                return;
            }
        }
    }

    async fn notify_polling(self: &Arc<Self>, w: &Watch) {
        let max_age = w.info.max_age;
        let mut index = 0;
        let mut last: Option<Value> = None;
        let mut failures: u32 = 0;
        let mut erroring = false;
        loop {
            if w.ctx.is_cancelled() {
                return;
            }
            let result = self
                .get_with_index(&w.ctx, w.tentry.clone(), w.req.clone(), w.at_index(index))
                .await;

            let wait = match result {
                Err(err) if err.is_canceled() => return,
                Ok((value, meta)) => {
                    failures = 0;
                    let wait = max_age.saturating_sub(meta.age);
                    let changed = erroring
                        || index != meta.index
                        || !last.as_ref().is_some_and(|l| l.ptr_eq(&value));
                    erroring = false;
                    if changed {
                        index = meta.index;
                        last = Some(value.clone());
                        if !w.send(Ok((value, meta))).await {
                            return;
                        }
                    }
                    wait
                }
                Err(err) => {
                    failures = failures.saturating_add(1);
                    // Report an outage once, not once per retry.
                    if !erroring && !w.send(Err(err)).await {
                        return;
                    }
                    erroring = true;
                    self.backoff.wait(failures)
                }
            };

            if !self.pause(w, wait).await {
                return;
            }
        }
    }

    /// Sleeps unless the watch or the cache ends first.
    async fn pause(&self, w: &Watch, wait: Duration) -> bool {
        if wait.is_zero() {
            return true;
        }
        tokio::select! {
            _ = w.ctx.cancelled() => false,
            _ = self.shutdown.cancelled() => false,
            _ = tokio::time::sleep(wait) => true,
        }
    }
}
