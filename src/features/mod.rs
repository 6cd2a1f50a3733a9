//! Features Module - schema and request alignment
//!
//! Every numeric stage downstream assumes the column order defined here.

pub mod align;
pub mod schema;

// Re-export common types
pub use align::{align, InboundRecord};
pub use schema::FeatureSchema;
