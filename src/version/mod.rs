//! Version resolution layer
//!
//! Turns a symbolic request plus an optional constraint into one concrete
//! Terraform version.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ Declaration │────▶│  Resolver   │◀────│   Catalog   │
//! │ (*.tf, pin) │     │  (policy)   │     │ (versions)  │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!                                                │
//!                                  ┌─────────────┴─────────────┐
//!                                  ▼                           ▼
//!                           ┌─────────────┐             ┌─────────────┐
//!                           │ Local store │             │    Index    │
//!                           │ (read_dir)  │             │   (HTTP)    │
//!                           └─────────────┘             └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`catalog`]: Descending, deduplicated version sets and their sources
//! - [`constraint`]: `required_version` expressions
//! - [`declaration`]: `*.tf` scanning and the `.terraform-version` pin file
//! - [`error`]: Error types for catalog and resolution failures
//! - [`index`]: Remote release index trait and HTTP implementation
//! - [`request`]: Symbolic requests (`latest`, `min-required`, ...)
//! - [`resolver`]: Selection policies
//! - [`semver`]: Release name patterns and version parsing

pub mod catalog;
pub mod constraint;
pub mod declaration;
pub mod error;
pub mod index;
pub mod request;
pub mod resolver;
pub mod semver;
