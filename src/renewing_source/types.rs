use super::errors::FetchError;
use crate::resource::ExpiringResource;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Future returned by one [`Fetcher`] invocation.
pub type FetchFuture<T> = Pin<
    Box<dyn Future<Output = Result<Option<ExpiringResource<T>>, FetchError>> + Send + 'static>,
>;

/// Pluggable fetch delegate.
///
/// Each invocation attempts to produce one fresh value with its expiration.
/// `Ok(None)` means the delegate could not provide a value right now;
/// `Err` is an abrupt failure. Both leave the cached state untouched and are
/// retried at the next renewal tick. No further contract is assumed: the
/// delegate may be slow and may retry internally.
pub type Fetcher<T> = Arc<dyn Fn() -> FetchFuture<T> + Send + Sync + 'static>;
