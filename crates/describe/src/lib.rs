//! Stable build identifiers from the state of a git repository.
//!
//! A [`Describer`] locates the repository enclosing a directory, resolves
//! `HEAD`, abbreviates its id and reads its commit time, then injects a
//! formatted description and a reproducible timestamp into a caller-owned
//! [`PropertyStore`].

pub mod config;
pub mod engine;
pub mod error;
pub mod policy;
pub mod properties;
pub mod repository;
pub mod revision;
pub mod template;

pub use config::{ConfigError, DescribeConfig};
pub use engine::{DescribeReport, Describer, ResolutionOutcome};
pub use error::DescribeError;
pub use policy::{Assignment, OverridePolicyResult};
pub use properties::{MemoryPropertyStore, PropertiesFile, PropertyStore};
pub use revision::{GitRevisionSource, MockRevisionSource, Resolution, ResolvedRevision, RevisionSource};
pub use template::{DescriptionTemplate, TemplateError};
