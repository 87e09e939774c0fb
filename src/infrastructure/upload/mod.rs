//! Upload sink adapters

pub mod directory;
pub mod http;

pub use directory::DirectoryUploadSink;
pub use http::HttpUploadSink;
