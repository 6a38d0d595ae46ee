//! Resolver configuration.

use serde::{Deserialize, Serialize};

/// Default name of the identifier field merged into every [`Record`](crate::record::Record).
pub const DEFAULT_ID_FIELD: &str = "id";

/// Settings that shape how the resolver builds records.
///
/// Construct it once and pass it by value to a [`DocumentStore`](crate::store::DocumentStore),
/// or by reference to the free functions in [`resolver`](crate::resolver). It deserializes
/// with defaults for missing keys, so it can be embedded in an application's own config file.
///
/// # Example
///
/// ```ignore
/// use docpath::config::ResolverConfig;
///
/// let config = ResolverConfig::builder().with_id_field("uid").build();
/// assert_eq!(config.id_field, "uid");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Name of the field that carries the document id in returned records. Defaults to `"id"`.
    pub id_field: String,
}

impl ResolverConfig {
    pub fn new(id_field: impl Into<String>) -> Self {
        Self { id_field: id_field.into() }
    }

    pub fn builder() -> ResolverConfigBuilder {
        ResolverConfigBuilder::new()
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self { id_field: DEFAULT_ID_FIELD.to_string() }
    }
}

/// Builder for [`ResolverConfig`]. Unset values fall back to the defaults.
#[derive(Debug, Clone, Default)]
pub struct ResolverConfigBuilder {
    id_field: Option<String>,
}

impl ResolverConfigBuilder {
    pub fn new() -> Self {
        Self { id_field: None }
    }

    /// Sets the identifier field name.
    pub fn with_id_field(mut self, id_field: impl Into<String>) -> Self {
        self.id_field = Some(id_field.into());
        self
    }

    pub fn build(self) -> ResolverConfig {
        ResolverConfig {
            id_field: self.id_field.unwrap_or_else(|| DEFAULT_ID_FIELD.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_id() {
        assert_eq!(ResolverConfig::default().id_field, "id");
        assert_eq!(ResolverConfig::builder().build(), ResolverConfig::default());
    }

    #[test]
    fn missing_keys_deserialize_to_defaults() {
        let config: ResolverConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, ResolverConfig::default());

        let config: ResolverConfig = serde_json::from_str(r#"{ "id_field": "uid" }"#).unwrap();
        assert_eq!(config.id_field, "uid");
    }
}
