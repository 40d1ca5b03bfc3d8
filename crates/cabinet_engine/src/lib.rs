//! # Cabinet Engine
//!
//! Embedded key/value store engines.
//!
//! This crate provides five store kinds that share one handle lifecycle
//! (create, tune, open, operate, close):
//! - [`HashDb`] - unordered byte keys and values
//! - [`BTreeDb`] - ordered keys with duplicate values, walked by [`BTreeCursor`]
//! - [`FixedDb`] - positive integer ids with fixed-width values
//! - [`TableDb`] - rows of named columns, searched by [`TableQuery`]
//! - [`AbstractDb`] - one of the above, chosen by name
//!
//! Operations report success as `bool` or a sentinel value and leave an
//! [`ErrorCode`] on the handle, readable through [`NativeDb::ecode`].
//!
//! ## Example
//!
//! ```rust
//! use cabinet_engine::{FlatDb, HashDb, NativeDb, OpenMode};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let path = dir.path().join("casket.tch");
//!
//! let mut db = HashDb::create();
//! assert!(db.open(path.to_str().unwrap(), OpenMode::WRITER | OpenMode::CREATE));
//! assert!(db.put(b"foo", b"hop"));
//! assert_eq!(db.get(b"foo"), Some(b"hop".to_vec()));
//! assert!(db.close());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod abstract_db;
pub mod btree;
mod cursor;
mod error;
mod file;
pub mod fixed;
pub mod hash;
pub mod query;
mod store;
pub mod table;
mod traits;
mod types;

pub use abstract_db::AbstractDb;
pub use btree::{BTreeDb, TreeTuning};
pub use cursor::{BTreeCursor, CursorPos, Placement};
pub use error::{errmsg, EngineError, ErrorCode};
pub use fixed::{FixedDb, FixedTuning};
pub use hash::{HashDb, HashTuning};
pub use query::{op, order, SetOp, TableQuery};
pub use table::{index_type, IndexKind, TableDb, TableTuning};
pub use traits::{FlatDb, NativeDb, PrefixScan};
pub use types::{BackendKind, NativeList, NativeMap, OpenMode, TuningFlags};

/// Engine version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
