//! Identity Collaborator Client
//!
//! The identity service owns patients, doctors, and their linkage. This
//! crate only consumes it: resolving a patient's contact channel for
//! notification delivery and checking doctor↔patient linkage when an
//! alert is acknowledged.

mod directory;
mod http;
mod memory;

pub use directory::{Contact, ContactDirectory, DirectoryError};
pub use http::HttpDirectory;
pub use memory::StaticDirectory;
