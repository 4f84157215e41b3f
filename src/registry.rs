//! Known component identities, in insertion order.

use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::ExcludePattern;
use crate::error::DiscoveryError;

/// Stable key of a trackable component. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentIdentity {
    name: String,
    path: PathBuf,
    global: bool,
}

impl ComponentIdentity {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_global(&self) -> bool {
        self.global
    }

    fn from_descriptor(desc: &ComponentDescriptor) -> Result<Self, DiscoveryError> {
        let name = desc.display_name.trim();
        if name.is_empty() {
            return Err(DiscoveryError::EmptyName(desc.resolved_path.clone()));
        }
        if !is_pascal_case(name) {
            return Err(DiscoveryError::InvalidName {
                name: name.to_string(),
            });
        }
        if !desc.resolved_path.is_absolute() {
            return Err(DiscoveryError::RelativePath {
                name: name.to_string(),
                path: desc.resolved_path.clone(),
            });
        }
        Ok(Self {
            name: name.to_string(),
            path: desc.resolved_path.clone(),
            global: desc.is_global_only,
        })
    }
}

/// Tuple supplied by the discovery collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentDescriptor {
    pub display_name: String,
    pub resolved_path: PathBuf,
    #[serde(default)]
    pub is_global_only: bool,
}

impl ComponentDescriptor {
    pub fn new(display_name: impl Into<String>, resolved_path: impl Into<PathBuf>) -> Self {
        Self {
            display_name: display_name.into(),
            resolved_path: resolved_path.into(),
            is_global_only: false,
        }
    }

    pub fn global(mut self) -> Self {
        self.is_global_only = true;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryDiff {
    pub added: Vec<ComponentIdentity>,
    pub removed: Vec<ComponentIdentity>,
}

impl RegistryDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Component registry fed by discovery events.
///
/// Deduplicated by resolved path; the first descriptor for a path wins.
/// Entries that survive a re-registration keep their position, new entries
/// are appended.
pub struct Registry {
    entries: RwLock<IndexMap<PathBuf, ComponentIdentity>>,
    exclude: Vec<ExcludePattern>,
    globals_only: bool,
}

impl Registry {
    pub fn new(exclude: Vec<ExcludePattern>, globals_only: bool) -> Self {
        Self {
            entries: RwLock::new(IndexMap::new()),
            exclude,
            globals_only,
        }
    }

    /// Replace the known set with `descriptors`, returning what changed.
    /// Malformed descriptors are dropped with a warning.
    pub fn register(&self, descriptors: &[ComponentDescriptor]) -> RegistryDiff {
        let mut current: IndexMap<PathBuf, ComponentIdentity> = IndexMap::new();
        for desc in descriptors {
            if self.is_filtered(desc) {
                debug!(path = %desc.resolved_path.display(), "component filtered out");
                continue;
            }
            let identity = match ComponentIdentity::from_descriptor(desc) {
                Ok(identity) => identity,
                Err(err) => {
                    warn!(error = %err, "dropping discovered component");
                    continue;
                }
            };
            if current.contains_key(&identity.path) {
                continue;
            }
            if let Some(existing) = current.values().find(|c| c.name == identity.name) {
                let err = DiscoveryError::DuplicateName {
                    name: identity.name.clone(),
                    existing: existing.path.clone(),
                };
                warn!(error = %err, path = %identity.path.display(), "dropping discovered component");
                continue;
            }
            current.insert(identity.path.clone(), identity);
        }

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let previous: Vec<ComponentIdentity> = entries.values().cloned().collect();
        let next: Vec<ComponentIdentity> = current.values().cloned().collect();
        let diff = Self::diff(&previous, &next);

        entries.retain(|path, identity| current.get(path) == Some(identity));
        for (path, identity) in current {
            entries.entry(path).or_insert(identity);
        }
        diff
    }

    /// Components present in only one of the two sets.
    pub fn diff(previous: &[ComponentIdentity], current: &[ComponentIdentity]) -> RegistryDiff {
        RegistryDiff {
            added: current
                .iter()
                .filter(|c| !previous.contains(c))
                .cloned()
                .collect(),
            removed: previous
                .iter()
                .filter(|p| !current.contains(p))
                .cloned()
                .collect(),
        }
    }

    pub fn list(&self) -> Vec<ComponentIdentity> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    pub fn get(&self, path: &Path) -> Option<ComponentIdentity> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .cloned()
    }

    pub fn find_by_name(&self, name: &str) -> Option<ComponentIdentity> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .find(|c| c.name == name)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_filtered(&self, desc: &ComponentDescriptor) -> bool {
        if self.globals_only && !desc.is_global_only {
            return true;
        }
        self.exclude.iter().any(|p| p.matches(&desc.resolved_path))
    }
}

fn is_pascal_case(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_uppercase())
        && chars.all(|c| c.is_ascii_alphanumeric())
}

/// `MyButton` -> `my-button`.
pub fn kebab_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if c.is_ascii_uppercase() {
            if i > 0 {
                out.push('-');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// `my-button`, `my_button` or `myButton` -> `MyButton`.
pub fn pascal_case(name: &str) -> String {
    name.split(|c: char| c == '-' || c == '_' || c == '.' || c.is_whitespace())
        .filter(|seg| !seg.is_empty())
        .map(|seg| {
            let mut chars = seg.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}
