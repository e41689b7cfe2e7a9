//! Receipt and odometer extraction pipeline on top of interchangeable vision backends.

pub mod batch;
pub mod config;
pub mod document;
pub mod error;
pub mod extract;
pub mod odometer;
pub mod pipeline;
pub mod prompt;
pub mod selector;
pub mod store;
pub mod vault;

pub use batch::{BatchContext, BatchCoordinator, BatchItemResult, BatchReport, BatchStatus};
pub use config::{BackendKind, Config};
pub use document::{DocumentFormat, UploadedFile};
pub use error::PipelineError;
pub use extract::{ExtractedFields, ExtractionAmbiguity, LineItem, extract_fields, try_extract};
pub use odometer::{OdometerResult, normalize_reading};
pub use pipeline::{ExtractionPipeline, ExtractionRequest, ExtractionResult};
pub use prompt::{Template, build_prompt};
pub use selector::{BackendCapabilities, BackendCapability, SelectionError, select_backend};
