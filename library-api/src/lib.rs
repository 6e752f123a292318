//! Library catalog API.
//!
//! This crate holds the protobuf contract of the `library.v1.Library` service
//! and the domain models shared by the service and its clients:
//!
//! - Generated message types and the tonic server/client stubs
//! - Author and book models with their identifiers
//! - Parsed requests and catalog errors with their status classification
//!
//! # Features
//!
//! - `server`: Enables the generated `library_server` module
//! - `client`: Enables the generated `library_client` module

pub mod model;

#[allow(
    unused_qualifications,
    missing_docs,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::invalid_html_tags
)]
pub mod v1 {
    tonic::include_proto!("library.v1");

    pub const FILE_DESCRIPTOR_SET: &[u8] = tonic::include_file_descriptor_set!("library_v1");
}
