//! Installation layer
//!
//! - [`download`]: fetch a release archive into a bounded temporary file
//! - [`archive`]: validate and extract the archive into the version store
//! - [`installer`]: tie both together, mark completed installs, roll back
//!   failed ones
//! - [`error`]: archive and install errors

pub mod archive;
pub mod download;
pub mod error;
pub mod installer;
