//! Concurrent Enricher
//!
//! Fans a per-item detail fetch out over a list of identifiers with at most
//! `concurrency` fetches in flight, then waits for all of them. A failed,
//! timed out or cancelled fetch does not fail the batch: it yields a
//! degraded record for that identifier instead. Results come back in
//! completion order.

use futures::stream::{FuturesUnordered, StreamExt};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::sync::{watch, Semaphore};

/// Default ceiling on in-flight detail fetches
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Marker shown in place of details that could not be fetched
pub const UNKNOWN_STATUS: &str = "UNKNOWN";

/// Why a detail record is missing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unavailable {
    /// The fetch returned an error
    Failed(String),
    /// The fetch exceeded its deadline
    TimedOut,
    /// The batch was cancelled before this fetch was admitted
    Cancelled,
}

impl fmt::Display for Unavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed(reason) => write!(f, "unreachable: {}", reason),
            Self::TimedOut => f.write_str("timed out"),
            Self::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// Outcome of one detail fetch
#[derive(Debug, Clone, PartialEq)]
pub enum Detail<D> {
    Fetched(D),
    Unavailable(Unavailable),
}

/// One enrichment result, keyed by the identifier it was fetched for
#[derive(Debug, Clone, PartialEq)]
pub struct Enriched<D> {
    pub id: String,
    pub detail: Detail<D>,
}

impl<D> Enriched<D> {
    fn fetched(id: String, detail: D) -> Self {
        Self {
            id,
            detail: Detail::Fetched(detail),
        }
    }

    fn degraded(id: String, reason: Unavailable) -> Self {
        Self {
            id,
            detail: Detail::Unavailable(reason),
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self.detail, Detail::Unavailable(_))
    }

    pub fn detail(&self) -> Option<&D> {
        match &self.detail {
            Detail::Fetched(d) => Some(d),
            Detail::Unavailable(_) => None,
        }
    }

    /// Reason the detail is missing, if degraded
    pub fn unavailable(&self) -> Option<&Unavailable> {
        match &self.detail {
            Detail::Fetched(_) => None,
            Detail::Unavailable(reason) => Some(reason),
        }
    }
}

/// Bounded fan-out runner
#[derive(Debug, Clone)]
pub struct Enricher {
    concurrency: usize,
    fetch_timeout: Option<Duration>,
}

impl Enricher {
    /// Runner allowing `concurrency` fetches in flight (at least one)
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
            fetch_timeout: None,
        }
    }

    /// Give every fetch a deadline; slower fetches degrade to [`Unavailable::TimedOut`]
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = Some(timeout);
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Fetch details for every id. Always returns one result per id.
    pub async fn run<I, D, F, Fut>(&self, ids: I, fetch: F) -> Vec<Enriched<D>>
    where
        I: IntoIterator<Item = String>,
        F: Fn(String) -> Fut,
        Fut: Future<Output = anyhow::Result<D>>,
    {
        self.run_inner(ids, fetch, None).await
    }

    /// Like [`Enricher::run`], but stops admitting new fetches once `cancel`
    /// reads `true`. Fetches already in flight run to completion; ids never
    /// admitted come back as [`Unavailable::Cancelled`].
    pub async fn run_cancellable<I, D, F, Fut>(
        &self,
        ids: I,
        fetch: F,
        cancel: watch::Receiver<bool>,
    ) -> Vec<Enriched<D>>
    where
        I: IntoIterator<Item = String>,
        F: Fn(String) -> Fut,
        Fut: Future<Output = anyhow::Result<D>>,
    {
        self.run_inner(ids, fetch, Some(cancel)).await
    }

    async fn run_inner<I, D, F, Fut>(
        &self,
        ids: I,
        fetch: F,
        cancel: Option<watch::Receiver<bool>>,
    ) -> Vec<Enriched<D>>
    where
        I: IntoIterator<Item = String>,
        F: Fn(String) -> Fut,
        Fut: Future<Output = anyhow::Result<D>>,
    {
        let gate = Semaphore::new(self.concurrency);
        let fetch = &fetch;
        let gate = &gate;

        let mut pending: FuturesUnordered<_> = ids
            .into_iter()
            .map(|id| {
                let cancel = cancel.clone();
                async move {
                    let permit = match cancel {
                        Some(mut cancel) => tokio::select! {
                            biased;
                            _ = cancelled(&mut cancel) => None,
                            permit = gate.acquire() => permit.ok(),
                        },
                        None => gate.acquire().await.ok(),
                    };
                    let Some(_permit) = permit else {
                        return Enriched::degraded(id, Unavailable::Cancelled);
                    };

                    let outcome = match self.fetch_timeout {
                        Some(limit) => match tokio::time::timeout(limit, fetch(id.clone())).await {
                            Ok(result) => result.map_err(|e| Unavailable::Failed(format!("{:#}", e))),
                            Err(_) => Err(Unavailable::TimedOut),
                        },
                        None => fetch(id.clone())
                            .await
                            .map_err(|e| Unavailable::Failed(format!("{:#}", e))),
                    };

                    match outcome {
                        Ok(detail) => Enriched::fetched(id, detail),
                        Err(reason) => {
                            tracing::warn!("Detail fetch for {} degraded: {}", id, reason);
                            Enriched::degraded(id, reason)
                        }
                    }
                }
            })
            .collect();

        if pending.is_empty() {
            return Vec::new();
        }

        let total = pending.len();
        tracing::debug!(
            "Enriching {} items, concurrency {}",
            total,
            self.concurrency
        );

        let mut results = Vec::with_capacity(total);
        while let Some(result) = pending.next().await {
            results.push(result);
        }

        let degraded = results.iter().filter(|r| r.is_degraded()).count();
        if degraded > 0 {
            tracing::warn!("{} of {} detail fetches degraded", degraded, total);
        }

        results
    }
}

impl Default for Enricher {
    fn default() -> Self {
        Self::new(DEFAULT_CONCURRENCY)
    }
}

/// Resolves once the flag reads `true`; never resolves if the sender is gone
async fn cancelled(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
