//! Storage module for uploaded attachments
//!
//! Files are written to a directory under the process working directory and
//! attachment rows keep the relative path, so the public URL is `/<path>`.

mod local_storage;

pub use local_storage::{AttachmentStorage, LocalStorage, StoredFile};
