//! # tomo-sync
//!
//! Bidirectional sync engine between the internal catalog and the
//! WooCommerce stores.
//!
//! - [`store`] - the persistence seam ([`EntityStore`]) with skip-sync
//!   write markers
//! - [`mapper`] - pure transforms between catalog and store shapes
//! - [`resolve`] - name-based identity resolution for taxonomy terms
//! - [`outbound`] - catalog to store orchestration (create/update state
//!   machine, channel gating, cascades, delete mirroring)
//! - [`inbound`] - store payload ingestion with natural-key upserts
//! - [`reconcile`] - the periodic last-writer-wins term sweep

pub mod error;
pub mod inbound;
pub mod mapper;
pub mod outbound;
pub mod reconcile;
pub mod resolve;
pub mod store;

pub use error::{SyncError, SyncResult};
pub use inbound::{InboundSync, IngestSummary};
pub use outbound::{OutboundSync, SyncOutcome};
pub use reconcile::{DirectionCounts, ReconcileOptions, ReconcileSummary, TermReconciler};
pub use resolve::find_or_create_term;
pub use store::{EntityStore, MemoryStore, SaveMode, WriteRecord};
