//! Multi-tenant authorization core: roles, the per-request authorization
//! context, and the query scope injector.

pub mod context;
pub mod role;
pub mod scope;

pub use context::{AccessDenial, AuthContext, Principal, ScopedResource};
pub use role::Role;
pub use scope::{scope_pipeline, ScopedCollection, Verified};
