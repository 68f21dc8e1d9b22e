//! Provider registry (C4): maps a target platform name to the provider
//! that handles it, case-insensitively.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{CoreError, CoreResult};
use crate::provider::Provider;

/// Case-insensitive `platform -> Provider` lookup table, built once at
/// startup and shared read-only across the dispatcher's worker tasks.
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn Provider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider for `platform`. Fails if a provider is already
    /// registered for the same platform, case-insensitively.
    pub fn register(&mut self, platform: &str, provider: Arc<dyn Provider>) -> CoreResult<()> {
        let key = platform.to_ascii_lowercase();
        if self.providers.contains_key(&key) {
            return Err(CoreError::DuplicateProvider(platform.to_string()));
        }
        self.providers.insert(key, provider);
        Ok(())
    }

    /// Look up the provider for `platform`, case-insensitively.
    pub fn get(&self, platform: &str) -> CoreResult<Arc<dyn Provider>> {
        self.providers
            .get(&platform.to_ascii_lowercase())
            .cloned()
            .ok_or_else(|| CoreError::PlatformNotSupported(platform.to_string()))
    }

    pub fn is_supported(&self, platform: &str) -> bool {
        self.providers.contains_key(&platform.to_ascii_lowercase())
    }
}
