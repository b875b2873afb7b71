//! Upstream fetchers: the BFS registry snapshot and SPARQL reference sources.
//!
//! Blocking HTTP only. No retries: a failed fetch is reported to the caller,
//! which decides whether the run aborts or degrades.

mod client;
mod registry;
mod sparql;

pub use client::{FetchClient, FetchError, USER_AGENT};
pub use registry::{RegistryFetcher, RegistrySource};
pub use sparql::{coerce_code, parse_bindings, ReferenceSource, SparqlSource};
