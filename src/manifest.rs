//! Page manifests: fragment definitions and a page composition in TOML
//!
//! ```toml
//! [metadata]
//! name = "Landing page"
//!
//! [config]
//! marker_attribute = "data-module"
//!
//! [page]
//! regions = ["top", "app"]
//!
//! [[fragments]]
//! name = "header"
//! template_file = "header.html"
//! styles = ["/css/header.css"]
//!
//! [fragments.data]
//! title = "My site"
//!
//! [[mount]]
//! fragment = "header"
//! target = "#top"
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::loader::{FragmentDefinition, FragmentLoader, LoaderConfig};
use crate::page::Page;
use crate::value::Context;

/// Errors that can occur when loading or validating a manifest
#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("Failed to read manifest file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse manifest TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Fragment '{name}' is defined more than once")]
    DuplicateFragment { name: String },
    #[error("Fragment '{name}' must set exactly one of `template` and `template_file`")]
    TemplateSource { name: String },
    #[error("Failed to read template file {path} for fragment '{name}': {source}")]
    TemplateFile {
        name: String,
        path: PathBuf,
        source: std::io::Error,
    },
}

/// A fragment declared in a manifest, with its template text resolved
#[derive(Debug, Clone, PartialEq)]
pub struct FragmentSpec {
    pub name: String,
    pub template: String,
    pub styles: Vec<String>,
    pub scripts: Vec<String>,
    pub data: Context,
}

impl FragmentSpec {
    /// Build the definition this entry describes
    pub fn to_definition(&self) -> FragmentDefinition {
        FragmentDefinition::new(self.template.clone())
            .with_styles(self.styles.iter().cloned())
            .with_scripts(self.scripts.iter().cloned())
            .with_default_data(self.data.clone())
    }
}

/// One load to perform when composing the page
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MountSpec {
    pub fragment: String,
    pub target: String,
    #[serde(default)]
    pub data: Context,
}

/// Regions created in the page body before mounting
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PageLayout {
    pub regions: Vec<String>,
}

impl Default for PageLayout {
    fn default() -> Self {
        Self {
            regions: vec!["app".to_string()],
        }
    }
}

/// A parsed and validated manifest
#[derive(Debug, Clone)]
pub struct Manifest {
    /// Optional name for the manifest
    pub name: Option<String>,
    /// Optional description
    pub description: Option<String>,
    pub config: LoaderConfig,
    pub page: PageLayout,
    pub fragments: Vec<FragmentSpec>,
    pub mounts: Vec<MountSpec>,
}

/// TOML structure for deserializing manifests
#[derive(Deserialize)]
struct TomlManifest {
    metadata: Option<TomlMetadata>,
    #[serde(default)]
    config: LoaderConfig,
    #[serde(default)]
    page: PageLayout,
    #[serde(default)]
    fragments: Vec<TomlFragment>,
    #[serde(default)]
    mount: Vec<MountSpec>,
}

#[derive(Deserialize)]
struct TomlMetadata {
    name: Option<String>,
    description: Option<String>,
}

#[derive(Deserialize)]
struct TomlFragment {
    name: String,
    template: Option<String>,
    template_file: Option<PathBuf>,
    #[serde(default)]
    styles: Vec<String>,
    #[serde(default)]
    scripts: Vec<String>,
    #[serde(default)]
    data: Context,
}

impl Manifest {
    /// Load a manifest from a TOML file; template files resolve relative to
    /// the manifest's directory
    pub fn from_file(path: &Path) -> Result<Self, ManifestError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content, path.parent())
    }

    /// Load a manifest from a TOML string; template files resolve relative to
    /// the working directory
    pub fn from_str(content: &str) -> Result<Self, ManifestError> {
        Self::parse(content, None)
    }

    fn parse(content: &str, base_dir: Option<&Path>) -> Result<Self, ManifestError> {
        let parsed: TomlManifest = toml::from_str(content)?;

        let mut seen = HashSet::new();
        let mut fragments = Vec::with_capacity(parsed.fragments.len());
        for fragment in parsed.fragments {
            if !seen.insert(fragment.name.clone()) {
                return Err(ManifestError::DuplicateFragment {
                    name: fragment.name,
                });
            }
            let template = resolve_template(&fragment, base_dir)?;
            fragments.push(FragmentSpec {
                name: fragment.name,
                template,
                styles: fragment.styles,
                scripts: fragment.scripts,
                data: fragment.data,
            });
        }

        Ok(Manifest {
            name: parsed.metadata.as_ref().and_then(|m| m.name.clone()),
            description: parsed.metadata.as_ref().and_then(|m| m.description.clone()),
            config: parsed.config,
            page: parsed.page,
            fragments,
            mounts: parsed.mount,
        })
    }

    /// Look up a fragment entry by name
    pub fn fragment(&self, name: &str) -> Option<&FragmentSpec> {
        self.fragments.iter().find(|f| f.name == name)
    }

    /// Register every fragment with a loader
    pub fn register_all<P: Page>(&self, loader: &FragmentLoader<P>) {
        for fragment in &self.fragments {
            loader.register(&fragment.name, fragment.to_definition());
        }
    }
}

fn resolve_template(
    fragment: &TomlFragment,
    base_dir: Option<&Path>,
) -> Result<String, ManifestError> {
    match (&fragment.template, &fragment.template_file) {
        (Some(template), None) => Ok(template.clone()),
        (None, Some(file)) => {
            let path = match base_dir {
                Some(base) => base.join(file),
                None => file.clone(),
            };
            std::fs::read_to_string(&path).map_err(|source| ManifestError::TemplateFile {
                name: fragment.name.clone(),
                path,
                source,
            })
        }
        _ => Err(ManifestError::TemplateSource {
            name: fragment.name.clone(),
        }),
    }
}
