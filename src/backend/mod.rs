//! Managed-backend capability interfaces
//!
//! The WEJAY application sits on a managed backend: an identity provider,
//! a document database, and an object store.  The Spotify connection core
//! only needs them as opaque capabilities, so each is a small trait here
//! with in-process implementations used by the CLI host and by tests.
//!
//! # Module Layout
//!
//! - [`identity`] -- who the signed-in local user is
//! - [`document`] -- `get`/`set` of field maps keyed by collection and id
//! - [`blob`]     -- `put`/`get` of opaque byte blobs addressed by URL

pub mod blob;
pub mod document;
pub mod identity;

pub use blob::{BlobStore, MemoryBlobStore};
pub use document::{DocumentStore, Fields, JsonFileDocumentStore, MemoryDocumentStore};
pub use identity::{IdentityProvider, StaticIdentity};
