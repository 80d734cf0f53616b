//! Entity store abstraction for the portal navigation engine.
//!
//! This crate provides the record types the navigation engine works with and
//! the [`EntityStore`] trait that abstracts the remote entity store holding
//! them. This enables:
//!
//! - **Unit testing** the engine without a live store session
//! - **Backend flexibility** (in-memory fixtures, remote entity services)
//! - **Clean separation** between path resolution logic and query plumbing
//!
//! # Architecture
//!
//! The crate provides:
//! - Typed records ([`Website`], [`Page`], [`File`], [`Attachment`], [`PageTemplate`])
//!   populated once at the store boundary
//! - [`EntityStore`] trait with the queries the engine issues
//! - [`MemoryStore`] implementation backed by in-memory tables, loadable
//!   from a YAML fixture
//!
//! # Example
//!
//! ```ignore
//! use portal_store::{EntityStore, MemoryStore, SiteMarker};
//!
//! let store = MemoryStore::load("site.yaml")?;
//! let website = store.find_website("Portal")?.unwrap();
//! let home = store.find_page_by_site_marker(&website, SiteMarker::Home)?;
//! ```

mod memory;
mod record;
mod store;

pub use memory::{Fixture, FixtureAttachment, MemoryStore};
pub use record::{
    Attachment, EntityKind, File, Page, PageTemplate, Record, RecordState, SiteMarker,
    SiteMarkerBinding, Website,
};
pub use store::{EntityStore, ErrorStatus, StoreError, StoreErrorKind};
