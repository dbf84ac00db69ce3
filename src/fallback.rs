use crate::request::RequestDescriptor;

/// Produces a deterministic best-effort result when the primary path is
/// unavailable or exhausted. Implementations must be fast and non-networked;
/// their internal heuristics are the application's business.
pub trait FallbackProvider: Send + Sync {
    fn produce(&self, descriptor: &RequestDescriptor) -> serde_json::Value;
}

/// Always returns the same value. Useful as a default and in tests.
pub struct StaticFallback {
    value: serde_json::Value,
}

impl StaticFallback {
    pub fn new(value: serde_json::Value) -> Self {
        Self { value }
    }
}

impl Default for StaticFallback {
    fn default() -> Self {
        Self::new(serde_json::Value::Null)
    }
}

impl FallbackProvider for StaticFallback {
    fn produce(&self, _descriptor: &RequestDescriptor) -> serde_json::Value {
        self.value.clone()
    }
}
