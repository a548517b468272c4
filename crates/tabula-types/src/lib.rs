//! Foundation types for tabula.
//!
//! Every chunk and every table file in tabula is named by an [`Address`]: the
//! 32-byte BLAKE3 hash of its content. The same address names a table file's
//! object in a remote bucket and keys the process-wide index cache.
//!
//! # Key Types
//!
//! - [`Address`]: Content-addressed identifier for chunks and table files
//! - [`ContentHasher`]: Domain-separated hasher used to name table files

pub mod address;
pub mod error;
pub mod hasher;

pub use address::{Address, ADDRESS_LEN};
pub use error::TypeError;
pub use hasher::ContentHasher;
