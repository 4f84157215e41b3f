//! Filesystem discovery of component sources.
//!
//! Hosts that already know their component set feed
//! [`ComponentDescriptor`]s to the registry directly; this walker is what the
//! CLI uses to produce the same tuples from a list of directories.

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::warn;
use walkdir::WalkDir;

use crate::registry::{pascal_case, ComponentDescriptor};

const SKIPPED_DIRS: &[&str] = &["node_modules", "dist", ".git", ".nuxt", ".output", "target"];
const COMPONENT_EXT: &str = "vue";
const GLOBAL_DIR: &str = "global";
const GLOBAL_SUFFIX: &str = ".global";

pub fn discover(dirs: &[PathBuf]) -> Vec<ComponentDescriptor> {
    let mut files: Vec<(PathBuf, PathBuf)> = Vec::new();
    for dir in dirs {
        let root = match std::fs::canonicalize(dir) {
            Ok(root) => root,
            Err(err) => {
                warn!(dir = %dir.display(), error = %err, "skipping component directory");
                continue;
            }
        };
        for entry in WalkDir::new(&root)
            .into_iter()
            .filter_entry(|e| !is_skipped(e.path()))
            .filter_map(|e| e.ok())
        {
            let p = entry.path();
            if p.is_file() && p.extension().is_some_and(|ext| ext == COMPONENT_EXT) {
                files.push((root.clone(), p.to_path_buf()));
            }
        }
    }

    let mut out: Vec<ComponentDescriptor> = files
        .par_iter()
        .filter_map(|(root, path)| describe(root, path))
        .collect();
    out.sort_by(|a, b| a.resolved_path.cmp(&b.resolved_path));
    out.dedup_by(|a, b| a.resolved_path == b.resolved_path);
    out
}

fn is_skipped(path: &Path) -> bool {
    path.file_name()
        .map(|name| SKIPPED_DIRS.iter().any(|s| name == *s))
        .unwrap_or(false)
}

fn describe(root: &Path, path: &Path) -> Option<ComponentDescriptor> {
    let relative = path.strip_prefix(root).ok()?;
    let stem = path.file_stem()?.to_string_lossy().to_string();
    let (stem, global_suffix) = match stem.strip_suffix(GLOBAL_SUFFIX) {
        Some(base) => (base.to_string(), true),
        None => (stem, false),
    };

    let dirs: Vec<String> = relative
        .parent()
        .map(|parent| {
            parent
                .components()
                .map(|c| c.as_os_str().to_string_lossy().to_string())
                .collect()
        })
        .unwrap_or_default();
    let in_global_dir = dirs.iter().any(|d| d == GLOBAL_DIR);
    let dirs: Vec<&String> = dirs.iter().filter(|d| *d != GLOBAL_DIR).collect();

    let file_part = if stem == "index" { String::new() } else { pascal_case(&stem) };
    let mut name = String::new();
    for dir in dirs {
        let seg = pascal_case(dir);
        if !file_part.is_empty() && file_part.to_lowercase().starts_with(&seg.to_lowercase()) {
            break;
        }
        name.push_str(&seg);
    }
    name.push_str(&file_part);
    if name.is_empty() {
        return None;
    }

    Some(ComponentDescriptor {
        display_name: name,
        resolved_path: path.to_path_buf(),
        is_global_only: global_suffix || in_global_dir,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "<template><div /></template>").unwrap();
    }

    #[test]
    fn names_follow_directory_prefixes() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "Button.vue");
        touch(dir.path(), "base/Card.vue");
        touch(dir.path(), "button/ButtonGroup.vue");
        touch(dir.path(), "form/index.vue");
        touch(dir.path(), "global/Alert.vue");
        touch(dir.path(), "Toast.global.vue");
        touch(dir.path(), "node_modules/pkg/Hidden.vue");
        touch(dir.path(), "notes.md");

        let found = discover(&[dir.path().to_path_buf()]);
        let mut names: Vec<(&str, bool)> = found
            .iter()
            .map(|d| (d.display_name.as_str(), d.is_global_only))
            .collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                ("Alert", true),
                ("BaseCard", false),
                ("Button", false),
                ("ButtonGroup", false),
                ("Form", false),
                ("Toast", true),
            ]
        );
        assert!(found.iter().all(|d| d.resolved_path.is_absolute()));
    }

    #[test]
    fn missing_directory_is_skipped() {
        let found = discover(&[PathBuf::from("/definitely/not/here")]);
        assert!(found.is_empty());
    }
}
