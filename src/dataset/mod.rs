//! Dataset assembly from tagged imagesets.

pub mod create;
mod error;
pub mod filter;
pub mod metadata;
pub mod pipeline;
mod record;
pub mod split;
pub mod stages;
mod tags;

pub use create::{CreateInput, CreateOutput, ProcessedResult, process_result};
pub use error::{DatasetError, PluginError};
pub use metadata::{Dataset, DatasetMetadata, METADATA_FILE_NAME};
pub use pipeline::{
    AssemblyState, AssociatedFiles, DatasetPipeline, DatasetPlugin, FileAssociation,
    PipelineReport, SplitSummary, assemble,
};
pub use record::{ConstructedObject, RecordRef};
pub use stages::{Stage, StageRegistry};
pub use tags::TagMatrix;
