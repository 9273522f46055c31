//! Operation registry
//!
//! Named operations callable through an index view, each with the cache
//! scope its results are shared under.
//!
//! # Built-in operations
//!
//! | name        | arguments                  | result     | scope  |
//! |-------------|----------------------------|------------|--------|
//! | `order_by`  | `[orderings]`              | collection | global |
//! | `filter_by` | `[field, value]`           | collection | global |
//! | `slice`     | `[offset, limit?]`         | collection | global |
//! | `count`     | `[]`                       | value      | global |

use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;

use crate::flex::{CallResult, FlexCollection, FlexError, FlexResult, Orderings};

pub const ORDER_BY: &str = "order_by";
pub const FILTER_BY: &str = "filter_by";
pub const SLICE: &str = "slice";
pub const COUNT: &str = "count";

/// How widely an operation's results may be shared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheScope {
    /// Never cached
    Uncached,
    /// Shared by every caller
    Global,
    /// Shared within one session only
    Session,
}

/// Per-call context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallContext {
    session_id: Option<String>,
}

impl CallContext {
    /// Context without a session
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn session(id: impl Into<String>) -> Self {
        Self {
            session_id: Some(id.into()),
        }
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Scope component of the cache fingerprint, `None` when the call
    /// cannot be cached under `scope` in this context.
    pub fn scope_key(&self, scope: CacheScope) -> Option<String> {
        match scope {
            CacheScope::Uncached => None,
            CacheScope::Global => Some(String::new()),
            CacheScope::Session => self.session_id.clone(),
        }
    }
}

type Handler = Box<dyn Fn(&FlexCollection, &[Value]) -> FlexResult<CallResult>>;

/// A registered operation.
pub struct Operation {
    name: String,
    scope: CacheScope,
    handler: Handler,
}

impl Operation {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn scope(&self) -> CacheScope {
        self.scope
    }

    pub fn invoke(&self, collection: &FlexCollection, arguments: &[Value]) -> FlexResult<CallResult> {
        (self.handler)(collection, arguments)
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("name", &self.name)
            .field("scope", &self.scope)
            .finish()
    }
}

/// Name -> operation table.
#[derive(Debug, Default)]
pub struct OperationRegistry {
    operations: BTreeMap<String, Operation>,
}

impl OperationRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in operations
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(ORDER_BY, CacheScope::Global, order_by);
        registry.register(FILTER_BY, CacheScope::Global, filter_by);
        registry.register(SLICE, CacheScope::Global, slice);
        registry.register(COUNT, CacheScope::Global, |c, _| {
            Ok(CallResult::Value(Value::from(c.len())))
        });
        registry
    }

    /// Registers or replaces an operation.
    pub fn register<F>(&mut self, name: impl Into<String>, scope: CacheScope, handler: F)
    where
        F: Fn(&FlexCollection, &[Value]) -> FlexResult<CallResult> + 'static,
    {
        let name = name.into();
        self.operations.insert(
            name.clone(),
            Operation {
                name,
                scope,
                handler: Box::new(handler),
            },
        );
    }

    pub fn get(&self, name: &str) -> Option<&Operation> {
        self.operations.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.operations.keys().map(String::as_str)
    }
}

fn order_by(collection: &FlexCollection, arguments: &[Value]) -> FlexResult<CallResult> {
    let orderings = match arguments.first() {
        Some(value) => Orderings::from_value(value)
            .map_err(|reason| FlexError::invalid_arguments(ORDER_BY, reason))?,
        None => Orderings::default(),
    };
    Ok(CallResult::Collection(collection.order_by(&orderings)))
}

fn filter_by(collection: &FlexCollection, arguments: &[Value]) -> FlexResult<CallResult> {
    let field = arguments
        .first()
        .and_then(Value::as_str)
        .ok_or_else(|| FlexError::invalid_arguments(FILTER_BY, "field name must be a string"))?;
    let value = arguments.get(1).unwrap_or(&Value::Null);
    Ok(CallResult::Collection(collection.filter_by(field, value)))
}

fn slice(collection: &FlexCollection, arguments: &[Value]) -> FlexResult<CallResult> {
    let offset = match arguments.first() {
        None | Some(Value::Null) => 0,
        Some(value) => value
            .as_u64()
            .ok_or_else(|| FlexError::invalid_arguments(SLICE, "offset must be a non-negative integer"))?
            as usize,
    };
    let limit = match arguments.get(1) {
        None | Some(Value::Null) => None,
        Some(value) => Some(
            value
                .as_u64()
                .ok_or_else(|| FlexError::invalid_arguments(SLICE, "limit must be a non-negative integer"))?
                as usize,
        ),
    };
    Ok(CallResult::Collection(collection.slice(offset, limit)))
}
