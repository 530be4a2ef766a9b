//! Terraform version manager
//!
//! - [`version`]: catalogs, constraints and resolution of version requests
//! - [`install`]: download and secure extraction into the version store
//! - [`switch`]: the active-version link
//! - [`toolchain`]: command flows built from the above

pub mod config;
pub mod http;
pub mod install;
pub mod logging;
pub mod switch;
pub mod toolchain;
pub mod version;
