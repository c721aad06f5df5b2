pub mod batch;
pub mod pipelines;

pub use batch::{BatchConverter, BatchProgress, ProgressEvent};
