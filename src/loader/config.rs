//! Configuration for mounting fragments

use serde::{Deserialize, Deserializer};

/// How mounted fragment roots are created and tagged
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Tag name of the element wrapping each mounted fragment
    pub container_tag: String,

    /// Class added to every fragment root. In TOML, `false` or `""` turns
    /// it off.
    #[serde(deserialize_with = "deserialize_container_class")]
    pub container_class: Option<String>,

    /// Attribute carrying the fragment name; unload finds roots by it
    pub marker_attribute: String,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            container_tag: "div".to_string(),
            container_class: Some("module-container".to_string()),
            marker_attribute: "data-module".to_string(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ClassSetting {
    Enabled(bool),
    Name(String),
}

fn deserialize_container_class<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let class = match ClassSetting::deserialize(deserializer)? {
        ClassSetting::Enabled(false) => None,
        ClassSetting::Enabled(true) => LoaderConfig::default().container_class,
        ClassSetting::Name(name) if name.is_empty() => None,
        ClassSetting::Name(name) => Some(name),
    };
    Ok(class)
}

impl LoaderConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the wrapper element's tag name
    pub fn with_container_tag(mut self, tag: impl Into<String>) -> Self {
        self.container_tag = tag.into();
        self
    }

    /// Set the class added to fragment roots
    pub fn with_container_class(mut self, class: impl Into<String>) -> Self {
        self.container_class = Some(class.into());
        self
    }

    /// Do not add a class to fragment roots
    pub fn without_container_class(mut self) -> Self {
        self.container_class = None;
        self
    }

    /// Set the attribute used to tag roots with their fragment name
    pub fn with_marker_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.marker_attribute = attribute.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LoaderConfig::default();
        assert_eq!(config.container_tag, "div");
        assert_eq!(config.container_class, Some("module-container".to_string()));
        assert_eq!(config.marker_attribute, "data-module");
    }

    #[test]
    fn test_builder_pattern() {
        let config = LoaderConfig::new()
            .with_container_tag("section")
            .without_container_class()
            .with_marker_attribute("data-fragment");

        assert_eq!(config.container_tag, "section");
        assert_eq!(config.container_class, None);
        assert_eq!(config.marker_attribute, "data-fragment");
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: LoaderConfig = toml::from_str(r#"marker_attribute = "data-widget""#)
            .expect("Should parse");
        assert_eq!(config.marker_attribute, "data-widget");
        assert_eq!(config.container_tag, "div");
    }

    #[test]
    fn test_container_class_can_be_disabled() {
        for source in ["container_class = false", r#"container_class = """#] {
            let config: LoaderConfig = toml::from_str(source).expect("Should parse");
            assert_eq!(config.container_class, None, "{}", source);
        }
    }

    #[test]
    fn test_container_class_from_toml() {
        let config: LoaderConfig =
            toml::from_str(r#"container_class = "fragment""#).expect("Should parse");
        assert_eq!(config.container_class.as_deref(), Some("fragment"));

        let config: LoaderConfig = toml::from_str("container_class = true").expect("Should parse");
        assert_eq!(config.container_class.as_deref(), Some("module-container"));
    }
}
