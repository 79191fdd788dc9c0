pub mod common;
pub mod document;
pub mod provenance;
pub mod user_context;
pub mod validation;

pub use common::*;
pub use document::Projection;
pub use provenance::ProvenanceInfo;
pub use user_context::*;
pub use validation::*;
