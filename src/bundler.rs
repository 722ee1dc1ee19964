//! Preview bundler: virtual file map -> one self-contained HTML document.
//!
//! The builder agent's preview pane renders a single sandboxed document.
//! Generated projects either ship a ready-made `preview.html`, or a regular
//! `index.html` whose stylesheet links, script tags and `src` attributes are
//! rewritten in place against the file map.

use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::vfs::{FileMap, VirtualFile, ROOT_DOCUMENT, SELF_CONTAINED_PREVIEW};

fn link_tag() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"<link[^>]+href=["']([^"']+)["'][^>]*>"#).expect("valid pattern"))
}

fn script_tag() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"<script[^>]+src=["']([^"']+)["'][^>]*></script>"#).expect("valid pattern")
    })
}

fn src_attribute() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"src=["']([^"']+)["']"#).expect("valid pattern"))
}

/// Assemble the preview document for the given file map.
///
/// Resolution policy, first match wins:
/// 1. a path ending in `preview.html` is returned verbatim;
/// 2. else a path ending in `index.html` is used as the base document and has
///    its referenced assets inlined;
/// 3. else there is nothing to render and `None` is returned.
///
/// Pure function of the map; callers re-invoke it whenever the map changes.
/// Suffix lookups take the first match in the map's ascending path order.
pub fn assemble_preview(files: &FileMap) -> Option<String> {
    if let Some(native) = find_by_suffix(files, SELF_CONTAINED_PREVIEW) {
        return Some(native.content.clone());
    }

    let index = find_by_suffix(files, ROOT_DOCUMENT)?;
    let html = inline_stylesheets(&index.content, files);
    let html = inline_scripts(&html, files);
    let html = inline_src_attributes(&html, files);
    Some(html)
}

fn find_by_suffix<'a>(files: &'a FileMap, suffix: &str) -> Option<&'a VirtualFile> {
    files.values().find(|file| file.name.ends_with(suffix))
}

/// Resolve a referenced path against the map: literal key first, then the
/// conventional subdirectories, then a suffix match across all known paths.
fn resolve<'a>(files: &'a FileMap, reference: &str, subdirs: &[&str]) -> Option<&'a VirtualFile> {
    if let Some(file) = files.get(reference) {
        return Some(file);
    }
    for dir in subdirs {
        if let Some(file) = files.get(&format!("{dir}/{reference}")) {
            return Some(file);
        }
    }
    files.values().find(|file| file.name.ends_with(reference))
}

/// Replace `<link ... href="x" ...>` stylesheet tags with inline `<style>`
/// blocks. Non-stylesheet links and unresolved references are left alone.
fn inline_stylesheets(html: &str, files: &FileMap) -> String {
    link_tag()
        .replace_all(html, |caps: &Captures| {
            let tag = &caps[0];
            if tag.contains("stylesheet") {
                if let Some(css) = resolve(files, &caps[1], &["css"]) {
                    return format!("<style>\n{}\n</style>", css.content);
                }
            }
            tag.to_string()
        })
        .into_owned()
}

/// Replace `<script src="x"></script>` tags with inline `<script>` blocks.
fn inline_scripts(html: &str, files: &FileMap) -> String {
    script_tag()
        .replace_all(html, |caps: &Captures| {
            match resolve(files, &caps[1], &["js"]) {
                Some(js) => format!("<script>\n{}\n</script>", js.content),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Rewrite remaining `src="x"` attributes to the referenced file's content,
/// which for binary assets is already a `data:` URI. Absolute URLs and
/// embedded data are left untouched.
fn inline_src_attributes(html: &str, files: &FileMap) -> String {
    src_attribute()
        .replace_all(html, |caps: &Captures| {
            let reference = &caps[1];
            if reference.starts_with("http") || reference.starts_with("data:") {
                return caps[0].to_string();
            }
            match resolve(files, reference, &["assets", "images"]) {
                Some(asset) => format!(r#"src="{}""#, asset.content),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}
