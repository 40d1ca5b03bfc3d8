//! # Cabinet Bind
//!
//! Host-independent half of the cabinet bindings.
//!
//! Every host binding builds on the same pieces: [`StoreHandle`] owns a
//! native store, [`CursorHandle`] and [`QueryHandle`] hold weak
//! back-references to theirs, and [`OpenPool`] runs `openAsync` opens on
//! worker threads. The Node addon in `bindings/node` wraps them in napi
//! classes and posts open completions to the Node event loop.
//!
//! [`Module`] is an in-process host built from the same pieces. It models
//! the host's dynamic values as [`HostValue`] and drives its own callback
//! loop through [`Module::run_pending`] and [`Module::run_until_idle`],
//! which lets the binding contract be tested without a JavaScript
//! runtime. Call-contract violations come back as [`CallError`]; engine
//! failures come back as `false` or `null` with the reason in the store's
//! `ecode()`.
//!
//! ## Example
//!
//! ```rust
//! use cabinet_bind::{BridgeConfig, HostValue, Module};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let path = dir.path().join("casket.tch");
//! let path = path.to_str().unwrap();
//!
//! let module = Module::new(BridgeConfig::default()).unwrap();
//! let store = module.construct("KeyedStore", &[]).unwrap();
//! let mode = module.constant("KeyedStore", "OWRITER").unwrap();
//! let create = module.constant("KeyedStore", "OCREAT").unwrap();
//! let mode = HostValue::Number(mode.as_number().unwrap() + create.as_number().unwrap());
//!
//! assert_eq!(module.call(&store, "open", &[path.into(), mode]).unwrap(), true.into());
//! module.call(&store, "put", &["foo".into(), "hop".into()]).unwrap();
//! assert_eq!(module.call(&store, "get", &["foo".into()]).unwrap(), "hop".into());
//! assert_eq!(module.call(&store, "close", &[]).unwrap(), true.into());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod args;
mod bridge;
mod config;
mod constants;
mod cursor;
mod error;
mod handle;
mod instance;
mod kinds;
mod marshal;
mod methods;
mod module;
mod query;
mod value;
mod worker;

pub use args::{bind, to_int32, to_int64, ArgType, Args, Fallback, Param, ANY, NUMBER, STRING, TUNING};
pub use bridge::AsyncBridge;
pub use config::BridgeConfig;
pub use constants::{class_constants, lookup, Constant};
pub use cursor::CursorHandle;
pub use error::{ArgumentError, CallError, HostException, UncaughtException};
pub use handle::StoreHandle;
pub use instance::Instance;
pub use marshal::{native_to_record, native_to_sequence, record_to_native, sequence_to_native};
pub use module::{class_named, Module};
pub use query::QueryHandle;
pub use value::{number_to_string, HostFunction, HostValue};
pub use worker::{OpenDone, OpenPool};

/// Binding version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
