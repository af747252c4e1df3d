//! Publish-event payloads.
//!
//! The publish driver passes its state to the publish hooks as positional
//! string arguments: booleans as `true`/`false` and lists as JSON.
//!
//! ```text
//! pre-publish-global  <dry-run> <no-git> <components-json> <registries-json>
//! pre-publish         <dry-run> <name> <version>
//! post-publish        <dry-run> <name> <version>
//! post-publish-global <dry-run> <components-json>
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::component::Component;
use crate::core::errors::HookError;
use crate::util::config::RegistryEntry;

/// A component selected for publishing together with its new version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishableComponent {
    pub component: Component,
    pub new_version: String,
}

/// A registry as seen by the publish hooks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryPayload {
    pub name: String,
    pub url: String,
}

impl From<&RegistryEntry> for RegistryPayload {
    fn from(entry: &RegistryEntry) -> Self {
        RegistryPayload {
            name: entry.name.clone(),
            url: entry.url.clone(),
        }
    }
}

/// Parse a boolean positional argument. Case is ignored.
pub fn parse_flag(value: &str) -> Result<bool, HookError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(HookError::InvalidFlag {
            value: value.to_string(),
        }),
    }
}

/// Render a boolean positional argument.
pub fn render_flag(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

pub fn encode_components(components: &[PublishableComponent]) -> Result<String> {
    serde_json::to_string(components).context("failed to encode component payload")
}

pub fn decode_components(raw: &str) -> Result<Vec<PublishableComponent>> {
    serde_json::from_str(raw).context("invalid component payload")
}

pub fn encode_registries(registries: &[RegistryPayload]) -> Result<String> {
    serde_json::to_string(registries).context("failed to encode registry payload")
}

pub fn decode_registries(raw: &str) -> Result<Vec<RegistryPayload>> {
    serde_json::from_str(raw).context("invalid registry payload")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_parse_flag_ignores_case() {
        assert!(parse_flag("true").unwrap());
        assert!(parse_flag("True").unwrap());
        assert!(!parse_flag("FALSE").unwrap());
        assert!(matches!(parse_flag("yes"), Err(HookError::InvalidFlag { .. })));
        assert_eq!(render_flag(true), "true");
    }

    #[test]
    fn test_component_payload_shape() {
        let payload = vec![PublishableComponent {
            component: Component {
                name: "@monorepo/test.core".to_string(),
                version: "1.0.0".to_string(),
                private: false,
                location: PathBuf::from("/repo/libs/test.core"),
            },
            new_version: "1.1.0".to_string(),
        }];

        let encoded = encode_components(&payload).unwrap();
        let value: serde_json::Value = serde_json::from_str(&encoded).unwrap();
        assert_eq!(value[0]["component"]["name"], "@monorepo/test.core");
        assert_eq!(value[0]["component"]["private"], false);
        assert_eq!(value[0]["new_version"], "1.1.0");

        assert_eq!(decode_components(&encoded).unwrap(), payload);
        assert!(decode_components("not json").is_err());
    }

    #[test]
    fn test_registry_payload_from_config() {
        let entry = RegistryEntry::new("github", "https://npm.pkg.github.com/").with_npmrc();
        let payload = RegistryPayload::from(&entry);
        let encoded = encode_registries(&[payload]).unwrap();
        assert_eq!(
            encoded,
            r#"[{"name":"github","url":"https://npm.pkg.github.com/"}]"#
        );
        assert_eq!(decode_registries(&encoded).unwrap()[0].name, "github");
    }
}
