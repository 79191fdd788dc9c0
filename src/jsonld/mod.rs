//! JSON-LD rendering of template instances: reduction to plain JSON and
//! conversion to RDF N-Quads.

pub mod error;
pub mod plain;
pub mod rdf;

pub use error::{JsonLdError, Result};
pub use plain::to_plain_json;
pub use rdf::to_nquads;
