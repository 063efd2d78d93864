//! Photos are embedded inline as data URLs inside the records themselves;
//! there is no separate blob store.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Read an image file and encode it as a `data:` URL.
pub fn data_url_from_file(path: &Path) -> Result<String> {
    let bytes = fs::read(path)
        .with_context(|| format!("reading photo {}", path.display()))?;
    Ok(format!("data:{};base64,{}", mime_for(path), STANDARD.encode(bytes)))
}

fn mime_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_a_file_as_a_data_url() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("tomato.png");
        fs::write(&path, [0x89, b'P', b'N', b'G']).unwrap();

        let url = data_url_from_file(&path).unwrap();
        assert!(url.starts_with("data:image/png;base64,"));
        assert!(url.len() > "data:image/png;base64,".len());
    }

    #[test]
    fn unknown_extensions_fall_back_to_octet_stream() {
        assert_eq!(mime_for(Path::new("photo.bmp")), "application/octet-stream");
        assert_eq!(mime_for(Path::new("photo.JPG")), "image/jpeg");
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(data_url_from_file(Path::new("/nonexistent/p.png")).is_err());
    }
}
