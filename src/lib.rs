//! Core of a self-hosted email capture appliance: an encrypted mailstore with
//! tokenized search, the durable hand-off queue in front of it, and the
//! arrival pipeline connecting the two.
//!
//! Every message field is encrypted at rest under an AEAD cipher; search runs
//! against keyed token hashes, so no plaintext ever touches disk. The SMTP
//! server hands parsed messages to [`pipeline::ingest::Ingestor`], the worker
//! binary drains the queue into [`store::Mailstore`], and API collaborators
//! read through `Mailstore` and subscribe to arrivals via
//! [`queue::NotifyBus`].

pub mod config;
pub mod crypto;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod queue;
pub mod store;
pub mod tokenize;

pub use error::{VaultError, VaultResult};
