//! ZIP packing and unpacking of the virtual file map.

use std::io::{Cursor, Read, Write};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

use super::{Artifact, ExportError, ZIP_MIME};
use crate::vfs::{FileMap, VirtualFile};

/// Zip entry names to drop on import, regardless of extension.
const JUNK_MARKERS: &[&str] = &["__MACOSX", ".DS_Store"];

const TEXT_EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx", "html", "css", "json", "md", "txt"];

/// Pack the file map into a ZIP artifact named `<file_stem>.zip`.
///
/// `data:`-URI entries are decoded back to their binary payload before
/// archiving; text entries are stored as-is.
pub fn pack(files: &FileMap, file_stem: &str) -> Result<Artifact, ExportError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();

    for file in files.values() {
        writer.start_file(file.name.as_str(), options)?;
        if file.is_binary() {
            let payload = data_uri_payload(file)?;
            writer.write_all(&payload)?;
        } else {
            writer.write_all(file.content.as_bytes())?;
        }
    }

    let cursor = writer.finish()?;
    Ok(Artifact::new(
        format!("{file_stem}.zip"),
        ZIP_MIME,
        cursor.into_inner(),
    ))
}

/// Unpack a ZIP blob into a fresh file map.
///
/// Directories and archive junk (`__MACOSX`, `.DS_Store`) are skipped. Known
/// binary assets become `data:` URIs tagged `binary`; known text files keep
/// their content with a mapped language tag; everything else is ignored.
pub fn unpack(bytes: &[u8]) -> Result<FileMap, ExportError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let mut files = FileMap::new();

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        if entry.is_dir() {
            continue;
        }
        let name = entry.name().to_string();
        if JUNK_MARKERS.iter().any(|marker| name.contains(marker)) {
            continue;
        }

        let extension = name.rsplit('.').next().unwrap_or("").to_ascii_lowercase();
        if let Some(mime) = binary_mime(&extension) {
            let mut payload = Vec::new();
            entry.read_to_end(&mut payload)?;
            let content = format!("data:{mime};base64,{}", STANDARD.encode(&payload));
            files.insert(name.clone(), VirtualFile::new(name, content, "binary"));
        } else if TEXT_EXTENSIONS.contains(&extension.as_str()) {
            let mut payload = Vec::new();
            entry.read_to_end(&mut payload)?;
            let content = String::from_utf8_lossy(&payload).into_owned();
            let language = language_for(&extension);
            files.insert(name.clone(), VirtualFile::new(name, content, language));
        }
    }

    Ok(files)
}

fn data_uri_payload(file: &VirtualFile) -> Result<Vec<u8>, ExportError> {
    let encoded = file
        .content
        .split_once(',')
        .map(|(_, payload)| payload)
        .ok_or_else(|| ExportError::MalformedDataUri(file.name.clone()))?;
    STANDARD
        .decode(encoded)
        .map_err(|_| ExportError::MalformedDataUri(file.name.clone()))
}

fn binary_mime(extension: &str) -> Option<&'static str> {
    match extension {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "svg" => Some("image/svg+xml"),
        "mp3" => Some("audio/mpeg"),
        "wav" => Some("audio/wav"),
        _ => None,
    }
}

fn language_for(extension: &str) -> &'static str {
    match extension {
        "ts" | "tsx" => "typescript",
        "js" | "jsx" => "javascript",
        "html" => "html",
        "css" => "css",
        _ => "plaintext",
    }
}
