//! Source checkout from FTP servers.
//!
//! A checkout resolves a named server profile from the [`common::registry::ServerRegistry`],
//! looks up its credentials, logs in, optionally wipes the local workspace, changes into
//! the remote directory and downloads the requested files one by one. The first file that
//! cannot be downloaded fails the whole checkout.
//!
//! # Example
//!
//! ```no_run
//! # async fn example() -> anyhow::Result<()> {
//! use std::sync::Arc;
//!
//! let store = Arc::new(common::profile::JsonProfileStore::new("servers.json"));
//! let registry = Arc::new(common::registry::ServerRegistry::load(store)?);
//! let credentials = common::credentials::CredentialResolver::empty();
//! let request = ftpscm::SyncRequest::new("release-server", "/pub", "workspace")
//!     .files(ftpscm::parse_file_list("a.txt,b.txt"))
//!     .clean_workspace_first(true);
//! let summary = ftpscm::Synchronizer::new(registry, credentials)
//!     .synchronize(&request)
//!     .await?;
//! println!("{summary}");
//! # Ok(())
//! # }
//! ```
//!
//! # Progress
//!
//! Progress lines go to a [`ProgressSink`]; by default [`TracingSink`] emits them with the
//! [`common::PROGRESS_TARGET`] target.

pub mod check;
pub mod error;
pub mod progress;
pub mod request;
pub mod sync;

pub use check::{CONNECTION_SUCCESS, test_connection};
pub use error::SyncError;
pub use progress::{ProgressSink, RecordingSink, TracingSink};
pub use request::{SyncRequest, parse_file_list};
pub use sync::{SyncSummary, Synchronizer};
