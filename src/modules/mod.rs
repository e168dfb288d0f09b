//! Modules layer - Infrastructure components outside the database
//!
//! Contains adapters for side resources such as the upload directory.

pub mod storage;
