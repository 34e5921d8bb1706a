//! Virtual file system
//!
//! Every file the compiler looks at, whether loose on disk or buried inside
//! nested archives, becomes a [`VirtualFile`] node. An [`IndexRoot`] is an
//! immutable snapshot over the forest of those nodes with lookups by full
//! path, content hash, root path and entry name. [`Context`] grows the
//! snapshot by walking folders on a [`WorkQueue`](crate::queue::WorkQueue).

pub mod context;
pub mod error;
pub mod extractor;
pub mod hash;
pub mod index_root;
pub mod path;
pub mod virtual_file;

pub use context::Context;
pub use error::VfsError;
pub use extractor::{ArchiveExtractor, NoExtractor, ZipExtractor};
pub use hash::{Hash, hash_bytes, hash_file, xxhash64_to_base64};
pub use index_root::IndexRoot;
pub use path::{FullPath, HashRelativePath};
pub use virtual_file::VirtualFile;
