//! The exported module: constructors, method calls, constants and the
//! host loop hooks.

use crate::args::{bind, ArgType, Param};
use crate::bridge::AsyncBridge;
use crate::config::BridgeConfig;
use crate::constants;
use crate::cursor::CursorHandle;
use crate::error::{ArgumentError, CallError, UncaughtException};
use crate::handle::StoreHandle;
use crate::instance::{HostObject, Instance};
use crate::kinds;
use crate::query::QueryHandle;
use crate::value::HostValue;
use cabinet_engine::BackendKind;
use std::io;
use std::rc::Rc;
use tracing::debug;

const CURSOR: &[Param] = &[Param::Required(ArgType::Instance(BackendKind::OrderedStore))];
const QUERY: &[Param] = &[Param::Required(ArgType::Instance(BackendKind::TabularStore))];

/// Looks up a class by its constructor name.
pub fn class_named(name: &str) -> Option<BackendKind> {
    BackendKind::from_class_name(name)
}

/// Entry point of the binding.
///
/// Owns the worker pool used by `openAsync`. A module is bound to the host
/// thread that created it; host values never leave that thread.
pub struct Module {
    bridge: AsyncBridge,
}

impl Module {
    /// Creates a module whose worker pool follows `config`.
    pub fn new(config: BridgeConfig) -> io::Result<Self> {
        Ok(Self {
            bridge: AsyncBridge::new(&config)?,
        })
    }

    /// Version string of the binding.
    pub fn version(&self) -> &'static str {
        crate::VERSION
    }

    /// Constructs a new instance of `class`.
    ///
    /// Stores take no arguments. `OrderedCursor` takes an `OrderedStore` and
    /// `TabularQuery` takes a `TabularStore`.
    pub fn construct(&self, class: &str, args: &[HostValue]) -> Result<HostValue, CallError> {
        let kind = class_named(class).ok_or_else(|| CallError::UnknownClass(class.to_string()))?;
        let object = match kind {
            BackendKind::KeyedStore => HostObject::Keyed(StoreHandle::new()),
            BackendKind::OrderedStore => HostObject::Ordered(StoreHandle::new()),
            BackendKind::FixedStore => HostObject::Fixed(StoreHandle::new()),
            BackendKind::TabularStore => HostObject::Tabular(StoreHandle::new()),
            BackendKind::AbstractStore => HostObject::Abstract(StoreHandle::new()),
            BackendKind::OrderedCursor => {
                let store = bind(args, CURSOR)?.instance(0);
                match store.as_deref().map(Instance::object) {
                    Some(HostObject::Ordered(h)) => HostObject::Cursor(CursorHandle::new(h)),
                    _ => return Err(ArgumentError { position: 0 }.into()),
                }
            }
            BackendKind::TabularQuery => {
                let store = bind(args, QUERY)?.instance(0);
                match store.as_deref().map(Instance::object) {
                    Some(HostObject::Tabular(h)) => HostObject::Query(QueryHandle::new(h)),
                    _ => return Err(ArgumentError { position: 0 }.into()),
                }
            }
        };
        debug!(class, "constructed");
        Ok(HostValue::Instance(Rc::new(Instance::new(object))))
    }

    /// Calls `method` on `this`, which must be a value returned by
    /// [`Module::construct`].
    pub fn call(
        &self,
        this: &HostValue,
        method: &str,
        args: &[HostValue],
    ) -> Result<HostValue, CallError> {
        let instance = this
            .as_instance()
            .ok_or(ArgumentError { position: 0 })?;
        kinds::call(&self.bridge, instance, method, args)
    }

    /// Value of the constant `name` on `class`.
    pub fn constant(&self, class: &str, name: &str) -> Option<HostValue> {
        let kind = class_named(class)?;
        constants::lookup(kind, name).map(|n| HostValue::Number(n as f64))
    }

    /// Every constant of `class` as an object.
    pub fn constants(&self, class: &str) -> Result<HostValue, CallError> {
        let kind = class_named(class).ok_or_else(|| CallError::UnknownClass(class.to_string()))?;
        Ok(HostValue::object(
            constants::class_constants(kind).map(|(name, n)| (name, HostValue::Number(n as f64))),
        ))
    }

    /// Number of async opens whose callback has not run.
    pub fn pending(&self) -> usize {
        self.bridge.pending()
    }

    /// Delivers the async completions that have already arrived.
    pub fn run_pending(&self) -> Result<usize, UncaughtException> {
        self.bridge.run_pending()
    }

    /// Blocks until every async open has delivered its callback.
    pub fn run_until_idle(&self) -> Result<usize, UncaughtException> {
        self.bridge.run_until_idle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module() -> Module {
        Module::new(BridgeConfig::new().workers(1)).unwrap()
    }

    #[test]
    fn constructs_every_store_class() {
        let m = module();
        for name in ["KeyedStore", "OrderedStore", "FixedStore", "TabularStore", "AbstractStore"] {
            let store = m.construct(name, &[]).unwrap();
            let class = store.as_instance().map(|i| i.class().class_name());
            assert_eq!(class, Some(name));
        }
        assert_eq!(
            m.construct("Nope", &[]),
            Err(CallError::UnknownClass("Nope".to_string()))
        );
    }

    #[test]
    fn cursor_and_query_need_matching_store() {
        let m = module();
        let ordered = m.construct("OrderedStore", &[]).unwrap();
        let tabular = m.construct("TabularStore", &[]).unwrap();
        assert!(m.construct("OrderedCursor", &[ordered.clone()]).is_ok());
        assert!(m.construct("TabularQuery", &[tabular.clone()]).is_ok());

        let bad = CallError::BadArguments(ArgumentError { position: 0 });
        assert_eq!(m.construct("OrderedCursor", &[tabular]), Err(bad.clone()));
        assert_eq!(m.construct("TabularQuery", &[ordered]), Err(bad.clone()));
        assert_eq!(m.construct("OrderedCursor", &[]), Err(bad));
    }

    #[test]
    fn call_needs_an_instance_receiver() {
        let m = module();
        assert_eq!(
            m.call(&"x".into(), "get", &[]),
            Err(CallError::BadArguments(ArgumentError { position: 0 }))
        );
        let store = m.construct("KeyedStore", &[]).unwrap();
        assert_eq!(
            m.call(&store, "frobnicate", &[]),
            Err(CallError::UnknownMethod {
                class: "KeyedStore",
                method: "frobnicate".to_string(),
            })
        );
    }

    #[test]
    fn constants_per_class() {
        let m = module();
        assert_eq!(m.constant("KeyedStore", "OWRITER"), Some(HostValue::Number(2.0)));
        assert_eq!(m.constant("OrderedCursor", "CPAFTER"), Some(HostValue::Number(2.0)));
        assert_eq!(m.constant("TabularQuery", "OWRITER"), None);
        assert_eq!(m.constant("Nope", "ESUCCESS"), None);
        let all = m.constants("TabularStore").unwrap();
        assert_eq!(all.get("ITKEEP"), Some(&HostValue::Number(f64::from(1 << 24))));
        assert_eq!(all.get("ENOREC"), Some(&HostValue::Number(22.0)));
        assert!(!m.version().is_empty());
    }
}
