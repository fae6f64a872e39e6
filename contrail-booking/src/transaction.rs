use contrail_core::error::{BookingError, BookingResult};
use contrail_core::repository::{BookingStore, UnitOfWork};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Runs `work` inside a single storage transaction.
///
/// The transaction commits only if `work` returns `Ok`. An error, a panic
/// inside `work` or an elapsed `deadline` rolls back every write; errors
/// returned by `work` reach the caller unchanged, panics and deadlines
/// surface as [`BookingError::TransactionAborted`].
///
/// `work` only sees a [`UnitOfWork`], which cannot open another
/// transaction, so scopes never nest.
pub async fn run_in_transaction<T, F>(
    store: &dyn BookingStore,
    deadline: Option<Duration>,
    work: F,
) -> BookingResult<T>
where
    T: Send,
    F: for<'t> FnOnce(&'t mut dyn UnitOfWork) -> BoxFuture<'t, BookingResult<T>> + Send,
{
    let mut uow = store.begin().await?;

    let outcome = {
        let guarded = AssertUnwindSafe(work(uow.as_mut())).catch_unwind();
        match deadline {
            Some(limit) => match tokio::time::timeout(limit, guarded).await {
                Ok(finished) => finished,
                Err(_) => Ok(Err(BookingError::TransactionAborted(format!(
                    "deadline of {}ms elapsed",
                    limit.as_millis()
                )))),
            },
            None => guarded.await,
        }
    };

    let result = match outcome {
        Ok(result) => result,
        Err(payload) => Err(BookingError::TransactionAborted(format!(
            "unit of work panicked: {}",
            panic_message(payload.as_ref())
        ))),
    };

    match result {
        Ok(value) => {
            uow.commit().await?;
            Ok(value)
        }
        Err(err) => {
            debug!("Rolling back transaction: {}", err);
            if let Err(rollback_err) = uow.rollback().await {
                // The open transaction is discarded by the backend anyway.
                warn!("Rollback failed after '{}': {}", err, rollback_err);
            }
            Err(err)
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// A store paired with the deadline every unit of work runs under.
#[derive(Clone)]
pub struct TransactionScope {
    store: Arc<dyn BookingStore>,
    deadline: Option<Duration>,
}

impl TransactionScope {
    pub fn new(store: Arc<dyn BookingStore>, deadline: Option<Duration>) -> Self {
        Self { store, deadline }
    }

    /// Non-transactional reads for validation and reporting.
    pub fn store(&self) -> &dyn BookingStore {
        self.store.as_ref()
    }

    pub async fn run<T, F>(&self, work: F) -> BookingResult<T>
    where
        T: Send,
        F: for<'t> FnOnce(&'t mut dyn UnitOfWork) -> BoxFuture<'t, BookingResult<T>> + Send,
    {
        run_in_transaction(self.store.as_ref(), self.deadline, work).await
    }
}
