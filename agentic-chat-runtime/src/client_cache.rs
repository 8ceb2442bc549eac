//! Process-wide cache of model client handles.

use crate::interfaces::{BackendFactory, ChatBackend, RuntimeError};
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Cache key: model identifier plus the exact temperature bits.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientKey {
    model: String,
    temperature_bits: u32,
}

impl ClientKey {
    pub fn new(model: &str, temperature: f32) -> Self {
        Self {
            model: model.to_string(),
            // -0.0 and 0.0 share a key
            temperature_bits: (temperature + 0.0).to_bits(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn temperature(&self) -> f32 {
        f32::from_bits(self.temperature_bits)
    }
}

/// Read-mostly cache of backend handles keyed by (model, temperature).
///
/// Entries live until the cache is dropped; there is no eviction.
pub struct ClientCache {
    factory: Arc<dyn BackendFactory>,
    clients: Mutex<HashMap<ClientKey, Arc<OnceCell<Arc<dyn ChatBackend>>>>>,
}

impl ClientCache {
    pub fn new(factory: Arc<dyn BackendFactory>) -> Self {
        Self {
            factory,
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Get the handle for a pair, constructing it on first use.
    ///
    /// The map lock only covers the slot lookup. Construction runs inside the
    /// pair's own cell, so concurrent first use of one pair constructs a
    /// single handle while other pairs proceed.
    ///
    /// # Errors
    /// Construction failures are returned and nothing is cached.
    pub fn get_client(
        &self,
        model: &str,
        temperature: f32,
    ) -> Result<Arc<dyn ChatBackend>, RuntimeError> {
        let key = ClientKey::new(model, temperature);
        let slot = self.clients.lock().entry(key).or_default().clone();

        if let Some(client) = slot.get() {
            debug!("Client cache hit: {} @ {}", model, temperature);
            return Ok(client.clone());
        }

        let client = slot.get_or_try_init(|| {
            let client = self.factory.connect(model, temperature).map_err(|e| {
                warn!("Failed to construct client for {} @ {}: {}", model, temperature, e);
                e
            })?;
            crate::metrics::increment_client_constructions();
            info!("Constructed client for {} @ {}", model, temperature);
            Ok::<_, RuntimeError>(client)
        })?;
        Ok(client.clone())
    }

    /// Number of constructed handles.
    pub fn len(&self) -> usize {
        self.clients
            .lock()
            .values()
            .filter(|slot| slot.get().is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, model: &str, temperature: f32) -> bool {
        self.clients
            .lock()
            .get(&ClientKey::new(model, temperature))
            .is_some_and(|slot| slot.get().is_some())
    }
}
