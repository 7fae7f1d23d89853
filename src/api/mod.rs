//! Contains the types for the high level pipeline builder API.

mod pipeline;

pub use pipeline::ExtractionPipeline;
