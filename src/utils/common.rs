use rand::Rng;
use std::path::Path;

/// NanoID alphabet (38 characters, lowercase alphanumeric + _-)
const NANOID_ALPHABET: &[u8] = b"_-0123456789abcdefghijklmnopqrstuvwxyz";

const DEFAULT_ID_LENGTH: usize = 8;

/// Generate a short random identifier, used for staging names during
/// case-only directory renames.
pub fn generate_id() -> String {
    generate_nanoid(DEFAULT_ID_LENGTH)
}

pub fn generate_nanoid(length: usize) -> String {
    let mut rng = rand::rng();
    let mut id = String::with_capacity(length);
    let len = NANOID_ALPHABET.len();

    for _ in 0..length {
        let idx = rng.random_range(0..len);
        id.push(NANOID_ALPHABET[idx] as char);
    }
    id
}

/// Guess MIME type from file path.
pub fn mime_guess(path: &Path) -> &str {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) => match ext.to_lowercase().as_str() {
            "html" | "htm" => "text/html",
            "css" => "text/css",
            "js" | "mjs" => "application/javascript",
            "json" => "application/json",
            "png" => "image/png",
            "jpg" | "jpeg" => "image/jpeg",
            "gif" => "image/gif",
            "svg" => "image/svg+xml",
            "ico" => "image/x-icon",
            "txt" => "text/plain",
            "xml" => "text/xml",
            "pdf" => "application/pdf",
            "zip" => "application/zip",
            "tar" => "application/x-tar",
            "gz" => "application/gzip",
            "mp3" => "audio/mpeg",
            "mp4" => "video/mp4",
            _ => "application/octet-stream",
        },
        None => "application/octet-stream",
    }
}

/// Human-readable byte size: `0 B`, `1.5 KB`, `2 MB`, ...
pub fn humanize_bytes(size: u64) -> String {
    const UNITS: [&str; 7] = ["B", "KB", "MB", "GB", "TB", "PB", "EB"];
    if size == 0 {
        return "0 B".to_string();
    }
    let exp = ((size as f64).log2() / 10.0).floor() as usize;
    let exp = exp.min(UNITS.len() - 1);
    let num = size as f64 / 1024f64.powi(exp as i32);
    let rounded = (num * 10.0).round() / 10.0;
    if (rounded - rounded.trunc()).abs() < f64::EPSILON {
        format!("{} {}", rounded.trunc() as u64, UNITS[exp])
    } else {
        format!("{:.1} {}", rounded, UNITS[exp])
    }
}
