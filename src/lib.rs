//! Site Office - document automation for a construction site office
//!
//! Commands ("create a handover act for apartment 45", "print act.docx")
//! are stored through a [`store::CommandStore`] and executed by the
//! polling [`agent::CommandAgent`]. Documents are generated as `.docx`
//! by [`generator`], inspected by [`docx::analyzer`], shaped after
//! previously seen documents by [`learning`], and shared through the
//! Yandex Disk client in [`disk`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use office_types::{DocumentParams, TemplateType};
//! use site_office::generator::DocumentGenerator;
//!
//! let generator = DocumentGenerator::new().unwrap();
//! let params = DocumentParams {
//!     apartment: Some("45".into()),
//!     ..Default::default()
//! };
//! let doc = generator
//!     .generate(TemplateType::HandoverAct, &params, None)
//!     .unwrap();
//! std::fs::write(&doc.file_name, &doc.bytes).unwrap();
//! ```

// Core error handling and configuration
pub mod config;
pub mod error;

// Command intake and persistence
pub mod commands;
pub mod store;

// Documents
pub mod docx;
pub mod generator;
pub mod learning;

// External services
pub mod disk;

// Background processing
pub mod agent;

// REST API
#[cfg(feature = "server")]
pub mod api;

pub mod services;

pub use agent::{CommandAgent, Printer};
pub use config::OfficeConfig;
pub use disk::YandexDiskClient;
pub use error::{OfficeError, OfficeResult};
pub use generator::{DocumentGenerator, GeneratedDocument, LetterStyle};
pub use learning::{LearningLibrary, StructureProfile};
pub use services::Services;
pub use store::{CommandStore, MemoryCommandStore};

#[cfg(feature = "database")]
pub use store::PgCommandStore;

pub use office_types;
