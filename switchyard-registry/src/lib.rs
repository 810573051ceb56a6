#![deny(missing_docs)]
//! Capability registry and router for switchyard.
//!
//! The [`CapabilityRegistry`] holds every handler in registration order.
//! It is built once at startup, shared read-only (`Arc<CapabilityRegistry>`)
//! while work runs, and only changes through `&mut` re-registration when
//! nothing else holds it.
//!
//! [`CapabilityRegistry::route`] is deliberately non-exclusive: every
//! handler whose trigger matches is returned, in registration order. An
//! empty route is not an error here; the caller decides.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use switchyard_proto::error::ConfigurationError;
use switchyard_proto::handler::{Capability, HandlerSpec};
use switchyard_proto::id::HandlerId;
use switchyard_proto::work::WorkItem;

/// A handler spec paired with its implementation. Cheap to clone.
#[derive(Clone)]
pub struct RegisteredHandler {
    spec: Arc<HandlerSpec>,
    capability: Arc<dyn Capability>,
    position: usize,
}

impl RegisteredHandler {
    /// The declared spec.
    pub fn spec(&self) -> &HandlerSpec {
        &self.spec
    }

    /// Shorthand for `spec().id`.
    pub fn id(&self) -> &HandlerId {
        &self.spec.id
    }

    /// The implementation.
    pub fn capability(&self) -> &Arc<dyn Capability> {
        &self.capability
    }

    /// Zero-based registration position. Determines result ordering.
    pub fn position(&self) -> usize {
        self.position
    }
}

impl fmt::Debug for RegisteredHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredHandler")
            .field("id", &self.spec.id)
            .field("category", &self.spec.category)
            .field("concurrency", &self.spec.concurrency)
            .field("position", &self.position)
            .finish()
    }
}

/// Process-wide catalog of capability handlers.
pub struct CapabilityRegistry {
    handlers: Vec<RegisteredHandler>,
    index: HashMap<HandlerId, usize>,
}

impl CapabilityRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Register a handler at the end of the catalog.
    ///
    /// Fails with `DuplicateCapability` if the id is taken, or with
    /// `ScopeConflict` if the handler is independent and its write scope
    /// overlaps another independent handler's write scope.
    pub fn register(
        &mut self,
        spec: HandlerSpec,
        capability: Arc<dyn Capability>,
    ) -> Result<(), ConfigurationError> {
        if self.index.contains_key(&spec.id) {
            tracing::error!(handler = %spec.id, "switchyard.registry.duplicate");
            return Err(ConfigurationError::DuplicateCapability(spec.id.to_string()));
        }
        self.check_scope(&spec, None)?;

        let position = self.handlers.len();
        tracing::debug!(
            handler = %spec.id,
            category = %spec.category,
            concurrency = %spec.concurrency,
            position,
            "switchyard.registry.register"
        );
        self.index.insert(spec.id.clone(), position);
        self.handlers.push(RegisteredHandler {
            spec: Arc::new(spec),
            capability,
            position,
        });
        Ok(())
    }

    /// Replace an existing handler in place, keeping its position.
    ///
    /// This is the only way a registered handler changes. Returns
    /// `Ok(false)` when no handler with that id exists (nothing changes).
    pub fn reregister(
        &mut self,
        spec: HandlerSpec,
        capability: Arc<dyn Capability>,
    ) -> Result<bool, ConfigurationError> {
        let Some(&position) = self.index.get(&spec.id) else {
            return Ok(false);
        };
        self.check_scope(&spec, Some(position))?;
        tracing::debug!(handler = %spec.id, position, "switchyard.registry.reregister");
        self.handlers[position] = RegisteredHandler {
            spec: Arc::new(spec),
            capability,
            position,
        };
        Ok(true)
    }

    fn check_scope(
        &self,
        spec: &HandlerSpec,
        skip: Option<usize>,
    ) -> Result<(), ConfigurationError> {
        if !spec.concurrency.is_independent() {
            return Ok(());
        }
        for existing in &self.handlers {
            if Some(existing.position) == skip || !existing.spec.concurrency.is_independent() {
                continue;
            }
            if let Some(resource) = existing.spec.scope.write_overlap(&spec.scope) {
                tracing::error!(
                    first = %existing.spec.id,
                    second = %spec.id,
                    resource = %resource,
                    "switchyard.registry.scope_conflict"
                );
                return Err(ConfigurationError::ScopeConflict {
                    first: existing.spec.id.to_string(),
                    second: spec.id.to_string(),
                    resource,
                });
            }
        }
        Ok(())
    }

    /// Look up a handler by id.
    pub fn get(&self, id: &HandlerId) -> Option<&RegisteredHandler> {
        self.index.get(id).map(|&i| &self.handlers[i])
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// All handlers, in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &RegisteredHandler> {
        self.handlers.iter()
    }

    /// Every handler whose trigger matches `item`, in registration order.
    pub fn route(&self, item: &WorkItem) -> Vec<RegisteredHandler> {
        let matched: Vec<RegisteredHandler> = self
            .handlers
            .iter()
            .filter(|h| h.spec.trigger.matches(item))
            .cloned()
            .collect();
        tracing::debug!(
            item = %item.id,
            matched = matched.len(),
            of = self.handlers.len(),
            "switchyard.router.route"
        );
        matched
    }
}

impl Default for CapabilityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CapabilityRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.handlers.iter()).finish()
    }
}
