//! # Field Resolvers
//!
//! Statically-typed functions that pull a value (destination, key, partition
//! key, ...) out of a message. Resolvers are injected at wiring time and are
//! read-only afterwards.

use std::fmt;
use std::sync::Arc;

use crate::error::{BridgeError, BridgeResult};
use crate::messaging::{Message, Payload};

type ResolveFn<T> = dyn Fn(&Message) -> BridgeResult<Option<T>> + Send + Sync;

/// Resolves an optional value of type `T` from a message
pub struct Resolver<T> {
    resolve: Arc<ResolveFn<T>>,
    description: String,
}

impl<T> Clone for Resolver<T> {
    fn clone(&self) -> Self {
        Self {
            resolve: Arc::clone(&self.resolve),
            description: self.description.clone(),
        }
    }
}

impl<T> fmt::Debug for Resolver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Resolver").field(&self.description).finish()
    }
}

impl<T: Send + Sync + 'static> Resolver<T> {
    /// Resolver from an infallible function
    pub fn new<F>(resolve: F) -> Self
    where
        F: Fn(&Message) -> Option<T> + Send + Sync + 'static,
    {
        Self {
            resolve: Arc::new(move |message| Ok(resolve(message))),
            description: "fn".to_string(),
        }
    }

    /// Resolver from a function that may reject the message
    pub fn try_new<F>(resolve: F) -> Self
    where
        F: Fn(&Message) -> BridgeResult<Option<T>> + Send + Sync + 'static,
    {
        Self {
            resolve: Arc::new(resolve),
            description: "try_fn".to_string(),
        }
    }

    /// Resolver that always yields the same value
    pub fn literal(value: T) -> Self
    where
        T: Clone + fmt::Debug,
    {
        let description = format!("literal({value:?})");
        Self {
            resolve: Arc::new(move |_| Ok(Some(value.clone()))),
            description,
        }
    }

    pub fn resolve(&self, message: &Message) -> BridgeResult<Option<T>> {
        (self.resolve)(message)
    }

    /// Resolve a value that must be present
    pub fn require(
        &self,
        message: &Message,
        component: &str,
        missing: impl Into<String>,
    ) -> BridgeResult<T> {
        self.resolve(message)?
            .ok_or_else(|| BridgeError::configuration(component, missing))
    }
}

impl Resolver<String> {
    /// Resolver reading a header rendered as a string
    pub fn header(name: impl Into<String>) -> Self {
        let name = name.into();
        let description = format!("header({name})");
        Self {
            resolve: Arc::new(move |message: &Message| Ok(message.headers().get_string(&name))),
            description,
        }
    }

    /// Resolver reading a string field of an object payload
    pub fn payload_field(field: impl Into<String>) -> Self {
        let field = field.into();
        let description = format!("payload_field({field})");
        Self {
            resolve: Arc::new(move |message: &Message| {
                Ok(match message.payload() {
                    Payload::Object(value) => value.get(&field).and_then(|v| v.as_str()).map(str::to_string),
                    _ => None,
                })
            }),
            description,
        }
    }
}

/// Resolve a value, letting a message header take precedence over the resolver
pub fn header_then_resolver(
    message: &Message,
    header: &str,
    resolver: Option<&Resolver<String>>,
) -> BridgeResult<Option<String>> {
    if let Some(value) = message.headers().get_string(header) {
        if !value.is_empty() {
            return Ok(Some(value));
        }
    }
    match resolver {
        Some(resolver) => Ok(resolver.resolve(message)?.filter(|value| !value.is_empty())),
        None => Ok(None),
    }
}
