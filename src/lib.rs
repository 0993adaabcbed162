//! Discovery engine for locating installed games and their support tools.
//!
//! The engine scans filesystem trees for characteristic marker files without
//! prior knowledge of install locations. Two entry points exist:
//!
//! - [`discovery::quick_discovery`] asks each application to self-report its
//!   install path and validates the answer.
//! - [`discovery::search_discovery`] brute-force walks user-supplied search
//!   roots and recognizes install directories from marker-file hits.
//!
//! Both stream results through a caller-supplied [`catalog::DiscoverySink`]
//! as soon as they are confirmed, and isolate failures so one broken
//! descriptor or unreadable directory never prevents discovery of the rest.

pub mod catalog;
pub mod discovery;
pub mod index;
pub mod manifest;
pub mod normalize;
pub mod progress;
pub mod verify;
pub mod walk;

pub use catalog::{Discovery, DiscoverySink, GameDescriptor, ToolDescriptor, ToolDiscovery};
pub use discovery::{quick_discovery, search_discovery};
