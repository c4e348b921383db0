//! # Meter Test Utilities
//!
//! Shared test utilities for the storage-meter middleware.
//!
//! This crate provides:
//! - Fake upstream services (`FakeApp`, `FailingApp`) with streaming bodies
//! - A chunked test body type (`ChunkBody`)
//! - A recording notifier (`RecordingNotifier`) with delay injection for
//!   dispatcher tests
//! - Request builders with storage headers
//!
//! ## Usage
//!
//! ```rust,ignore
//! use meter_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> anyhow::Result<()> {
//!     let notifier = Arc::new(RecordingNotifier::new());
//!     let meter = Meter::new(config, notifier.clone()).await?;
//!     let svc = ServiceBuilder::new().layer(meter.layer()).service(FakeApp::new());
//!
//!     let response = svc.oneshot(storage_request("GET", "/1.0/acct/c/o")?).await?;
//!     drain_body(response.into_body()).await;
//!
//!     let events = notifier.wait_for(1, Duration::from_secs(5)).await?;
//!     Ok(())
//! }
//! ```

pub mod fake_app;
pub mod harness;
pub mod notifier;
pub mod requests;

// Re-export commonly used items
pub use fake_app::*;
pub use harness::*;
pub use notifier::*;
pub use requests::*;
