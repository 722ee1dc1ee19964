//! Virtual file map shared by the builder agent and the preview bundler.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Reserved filename for a self-contained preview document.
pub const SELF_CONTAINED_PREVIEW: &str = "preview.html";

/// Reserved filename for the root document of an imported website.
pub const ROOT_DOCUMENT: &str = "index.html";

/// A single entry in the virtual project tree.
///
/// `content` is either plain text or a complete `data:` URI for binary
/// assets, never a mix of the two. Entries are replaced wholesale, never
/// partially edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualFile {
    /// Full path of the file, e.g. `src/App.tsx`. Matches its map key.
    pub name: String,
    /// Raw text content, or a `data:` URI for binary assets.
    pub content: String,
    /// Language tag (`typescript`, `javascript`, `html`, `css`, `binary`, ...).
    pub language: String,
}

impl VirtualFile {
    pub fn new(
        name: impl Into<String>,
        content: impl Into<String>,
        language: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            language: language.into(),
        }
    }

    /// True if this entry holds binary content encoded as a `data:` URI.
    pub fn is_binary(&self) -> bool {
        self.content.starts_with("data:")
    }
}

/// The in-memory project tree, keyed by path.
///
/// A `BTreeMap` is used deliberately: the bundler's suffix-match resolution
/// takes the first match in iteration order, so lookups are deterministic in
/// ascending lexicographic path order.
pub type FileMap = BTreeMap<String, VirtualFile>;

/// Merge a batch of generated files into the map, replacing whole entries.
///
/// Returns the names of the merged files, excluding the reserved
/// self-contained preview document (which is an implementation detail of the
/// preview pipeline, not a user-visible source file).
pub fn merge_generated(map: &mut FileMap, generated: Vec<VirtualFile>) -> Vec<String> {
    let mut changed = Vec::new();
    for file in generated {
        if !file.name.ends_with(SELF_CONTAINED_PREVIEW) {
            changed.push(file.name.clone());
        }
        map.insert(file.name.clone(), file);
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_replaces_whole_entries() {
        let mut map = FileMap::new();
        map.insert(
            "index.html".to_string(),
            VirtualFile::new("index.html", "<html>old</html>", "html"),
        );

        let changed = merge_generated(
            &mut map,
            vec![VirtualFile::new("index.html", "<html>new</html>", "html")],
        );

        assert_eq!(changed, vec!["index.html"]);
        assert_eq!(map["index.html"].content, "<html>new</html>");
    }

    #[test]
    fn test_merge_excludes_preview_from_changed_list() {
        let mut map = FileMap::new();
        let changed = merge_generated(
            &mut map,
            vec![
                VirtualFile::new("preview.html", "<html></html>", "html"),
                VirtualFile::new("src/App.tsx", "export default 1;", "typescript"),
            ],
        );

        assert_eq!(changed, vec!["src/App.tsx"]);
        // The preview document is still merged into the map.
        assert!(map.contains_key("preview.html"));
    }

    #[test]
    fn test_is_binary() {
        let text = VirtualFile::new("a.css", "body {}", "css");
        let binary = VirtualFile::new("a.png", "data:image/png;base64,AAAA", "binary");
        assert!(!text.is_binary());
        assert!(binary.is_binary());
    }

    #[test]
    fn test_map_iterates_in_path_order() {
        let mut map = FileMap::new();
        for name in ["z/style.css", "a/style.css", "m/style.css"] {
            map.insert(name.to_string(), VirtualFile::new(name, "", "css"));
        }
        let names: Vec<&str> = map.values().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a/style.css", "m/style.css", "z/style.css"]);
    }
}
