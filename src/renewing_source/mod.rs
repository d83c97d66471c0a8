//! Auto-renewing source: the caching/renewal core.
//!
//! This module provides the [`RenewingSource`] type and related configuration
//! types for keeping a single expiring value fresh in the background.
//!
//! `RenewingSource` arms its renewal task during construction and from then
//! on re-invokes the fetch delegate on a fixed period, retiring each value a
//! configured safety margin before its actual expiration. Transient fetch
//! failures are logged and retried on the same cadence; callers only ever
//! observe a value or its absence.
//!
//! Use [`RenewingSource::get`] to read the current value, and
//! [`RenewingSource::shutdown`] to stop the background worker.
//!
//! Primary types are re-exported at the crate root. For advanced
//! configuration types (e.g., `MetricsErrorKind`, `MetricsRecorder`), import
//! from this module.
//!
//! # Example
//!
//! ```no_run
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! use oauth2_token_source::{ExpiringResource, RenewingSourceBuilder};
//! use std::time::Duration;
//! use time::OffsetDateTime;
//!
//! let source = RenewingSourceBuilder::new()
//!     .fetch_with(|| async {
//!         let expires_at = OffsetDateTime::now_utc() + Duration::from_secs(300);
//!         Ok(Some(ExpiringResource::new("credential".to_string(), expires_at)))
//!     })
//!     .build()
//!     .await?;
//!
//! if let Some(resource) = source.get().await {
//!     println!("current value: {}", resource.value());
//! }
//!
//! source.shutdown().await;
//! # Ok(())
//! # }
//! ```

mod builder;
mod errors;
mod gate;
mod metrics;
mod renewal;
mod scheduler;
mod source;
mod types;

pub use builder::{RenewalConfig, RenewingSourceBuilder};
pub use errors::{FetchError, MetricsErrorKind, RenewingSourceError};
pub use metrics::MetricsRecorder;
pub use source::RenewingSource;
pub use types::{FetchFuture, Fetcher};
