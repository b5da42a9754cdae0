//! Bounded write dispatch.
//!
//! The pipeline acquires a permit before every spawn, so at most
//! `concurrency` writes run at any instant no matter how fast entries are
//! walked. The first failure wins the error slot and cancels everything else.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::content::ContentCopy;
use crate::error::{Error, Result};

/// First-error slot shared by the pipeline and every write task.
#[derive(Debug)]
pub(crate) struct FirstError {
    slot:   Mutex<Option<Error>>,
    cancel: CancellationToken,
}

impl FirstError {
    pub(crate) fn new(cancel: CancellationToken) -> Self {
        Self {
            slot: Mutex::new(None),
            cancel,
        }
    }

    /// Store `err` unless a failure was already recorded. Returns whether it won.
    pub(crate) fn record(&self, err: Error) -> bool {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            debug!(error = %err, "discarding failure after the first");
            return false;
        }
        debug!(error = %err, "extraction failed, cancelling remaining work");
        *slot = Some(err);
        drop(slot);
        self.cancel.cancel();
        true
    }

    pub(crate) fn take(&self) -> Option<Error> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).take()
    }
}

pub(crate) struct Dispatcher<W> {
    copier:  Arc<W>,
    permits: Arc<Semaphore>,
    failure: Arc<FirstError>,
    cancel:  CancellationToken,
    tasks:   JoinSet<()>,
}

impl<W> Dispatcher<W> {
    /// `cancel` should be private to this extraction; failures cancel it.
    pub(crate) fn new(copier: W, concurrency: usize, cancel: CancellationToken) -> Self {
        Self {
            copier: Arc::new(copier),
            permits: Arc::new(Semaphore::new(concurrency)),
            failure: Arc::new(FirstError::new(cancel.clone())),
            cancel,
            tasks: JoinSet::new(),
        }
    }

    /// Collects finished writes first, so a panicked task cancels before more work starts.
    pub(crate) fn check_cancelled(&mut self) -> Result<()> {
        self.reap();
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        Ok(())
    }

    /// Record a pipeline failure; stops further admission.
    pub(crate) fn fail(&self, err: Error) { self.failure.record(err); }

    /// Wait for a free permit, then spawn the write of `content` to `destination`.
    ///
    /// Blocks the caller while `concurrency` writes are in flight. Returns
    /// [`Error::Cancelled`] if cancellation fires first.
    pub(crate) async fn admit<C>(&mut self, destination: PathBuf, content: C) -> Result<()>
    where
        W: ContentCopy<C>,
        C: Send + 'static,
    {
        let permit = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(Error::Cancelled),
            permit = Arc::clone(&self.permits).acquire_owned() => {
                permit.map_err(|_| Error::Cancelled)?
            }
        };

        self.reap();

        let copier = Arc::clone(&self.copier);
        let failure = Arc::clone(&self.failure);
        let cancel = self.cancel.clone();

        trace!(path = %destination.display(), "dispatching write");
        self.tasks.spawn(async move {
            let _permit = permit;
            if cancel.is_cancelled() {
                failure.record(Error::Cancelled);
                return;
            }
            match copier.copy(destination.clone(), content, cancel.clone()).await {
                Ok(()) => trace!(path = %destination.display(), "write finished"),
                // An interrupted write is the cancellation, not a new failure.
                Err(_) if cancel.is_cancelled() => {
                    failure.record(Error::Cancelled);
                }
                Err(source) => {
                    failure.record(Error::Copy {
                        path: destination,
                        source,
                    });
                }
            }
        });
        Ok(())
    }

    /// Wait for every dispatched write and return the first recorded failure.
    pub(crate) async fn finish(mut self) -> Option<Error> {
        debug!(in_flight = self.tasks.len(), "waiting for writes to settle");
        while let Some(joined) = self.tasks.join_next().await {
            if let Err(source) = joined {
                self.failure.record(Error::TaskPanicked { source });
            }
        }
        self.failure.take()
    }

    /// Collect finished tasks so the set only tracks running writes.
    fn reap(&mut self) {
        while let Some(joined) = self.tasks.try_join_next() {
            if let Err(source) = joined {
                self.failure.record(Error::TaskPanicked { source });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn first_error_wins() {
        let cancel = CancellationToken::new();
        let failure = FirstError::new(cancel.clone());

        assert!(failure.record(Error::Cancelled));
        assert!(cancel.is_cancelled());
        assert!(!failure.record(Error::InvalidConcurrency));

        assert!(matches!(failure.take(), Some(Error::Cancelled)));
        assert!(failure.take().is_none());
    }

    #[tokio::test]
    async fn admitted_writes_all_run() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let copier = move |_: PathBuf, _: (), _: CancellationToken| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<(), io::Error>(())
            }
        };

        let mut dispatcher = Dispatcher::new(copier, 2, CancellationToken::new());
        for i in 0..10 {
            dispatcher.admit(PathBuf::from(format!("/out/{i}")), ()).await.unwrap();
        }
        assert!(dispatcher.finish().await.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 10);
    }

    #[tokio::test]
    async fn failure_cancels_and_blocks_admission() {
        let copier = |path: PathBuf, _: (), _: CancellationToken| async move {
            if path.ends_with("bad") {
                Err(io::Error::other("boom"))
            } else {
                Ok(())
            }
        };

        let cancel = CancellationToken::new();
        let mut dispatcher = Dispatcher::new(copier, 1, cancel.clone());
        dispatcher.admit(PathBuf::from("/out/bad"), ()).await.unwrap();
        cancel.cancelled().await;

        assert!(dispatcher.check_cancelled().is_err());
        let err = dispatcher.admit(PathBuf::from("/out/good"), ()).await.unwrap_err();
        assert!(err.is_cancelled());

        match dispatcher.finish().await {
            Some(Error::Copy { path, .. }) => assert_eq!(path, PathBuf::from("/out/bad")),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn cancellation_unblocks_waiting_admission() {
        let copier = |_: PathBuf, _: (), cancel: CancellationToken| async move {
            cancel.cancelled().await;
            Err::<(), _>(io::Error::new(io::ErrorKind::Interrupted, "stopped"))
        };

        let cancel = CancellationToken::new();
        let mut dispatcher = Dispatcher::new(copier, 1, cancel.clone());
        dispatcher.admit(PathBuf::from("/out/a"), ()).await.unwrap();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let err = dispatcher.admit(PathBuf::from("/out/b"), ()).await.unwrap_err();
        assert!(err.is_cancelled());
        assert!(matches!(dispatcher.finish().await, Some(Error::Cancelled)));
    }

    #[tokio::test]
    async fn panicking_write_is_reported() {
        let copier = |_: PathBuf, _: (), _: CancellationToken| async move {
            if true {
                panic!("copier bug");
            }
            Ok::<(), io::Error>(())
        };

        let mut dispatcher = Dispatcher::new(copier, 1, CancellationToken::new());
        dispatcher.admit(PathBuf::from("/out/a"), ()).await.unwrap();
        assert!(matches!(
            dispatcher.finish().await,
            Some(Error::TaskPanicked { .. })
        ));
    }

    #[tokio::test]
    async fn panic_cancels_before_next_admission() {
        let copier = |_: PathBuf, _: (), _: CancellationToken| async move {
            if true {
                panic!("copier bug");
            }
            Ok::<(), io::Error>(())
        };

        let cancel = CancellationToken::new();
        let mut dispatcher = Dispatcher::new(copier, 4, cancel.clone());
        dispatcher.admit(PathBuf::from("/out/a"), ()).await.unwrap();

        // Permits are still free, so only reaping can notice the panic.
        let mut stopped = false;
        for _ in 0..200 {
            if dispatcher.check_cancelled().is_err() {
                stopped = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        assert!(stopped, "panicked write never cancelled the pipeline");
        assert!(cancel.is_cancelled());
        assert!(matches!(
            dispatcher.finish().await,
            Some(Error::TaskPanicked { .. })
        ));
    }
}
