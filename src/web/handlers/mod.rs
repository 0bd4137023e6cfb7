//! HTTP request handlers for the dotlog API.

pub mod files;
pub mod records;
