//! Station Client
//!
//! Talks to a single connected station over a [`Transport`] and keeps a
//! local rule set in step with the station's behaviours.
//!
//! - [`StationClient`]: one request in flight at a time, per-step timeout
//! - [`Reconciler`]: fetch the remote index, classify, fetch what changed
//! - [`Scanner`]: decode advertisements, dropping recent duplicates
//! - [`StationConfig`]: YAML configuration
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use station_client::{Reconciler, StationClient, StationConfig};
//! use station_protocol::{ProtocolVersion, Session};
//!
//! let config = StationConfig::load("station.yaml")?;
//! let session = Arc::new(Session::with_version(ProtocolVersion::V5));
//! let client = StationClient::new(transport, session).with_timeout(config.fetch_timeout());
//!
//! let outcome = Reconciler::new(&client).reconcile(&local_rules).await?;
//! store.replace_all(outcome.into_behaviours());
//! ```

pub mod behaviour;
pub mod client;
pub mod config;
pub mod error;
pub mod index;
pub mod reconcile;
pub mod scanner;
pub mod transport;

pub use behaviour::{fletcher32, Behaviour, BehaviourRule};
pub use client::{StationClient, DEFAULT_REQUEST_TIMEOUT};
pub use config::StationConfig;
pub use error::{ClientError, TransportError};
pub use index::RemoteIndexEntry;
pub use reconcile::{classify, Reconciler, SyncOutcome, SyncPlan};
pub use scanner::{FixedClock, Scanned, Scanner, SystemClock, WallClock};
pub use transport::Transport;
