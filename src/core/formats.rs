use std::path::Path;

use little_exif::filetype::FileExtension;

pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "tif", "tiff", "webp", "heic", "heif", "avif", "jxl",
];

const IMAGE_MIME_PREFIX: &str = "image/";
const FALLBACK_MIME: &str = "application/octet-stream";

/// MIME type for a file on disk: content sniffing first, then the extension.
pub fn detect_mime(path: &Path, bytes: &[u8]) -> String {
    if let Some(kind) = infer::get(bytes) {
        return kind.mime_type().to_string();
    }

    mime_from_extension(path)
        .unwrap_or(FALLBACK_MIME)
        .to_string()
}

pub fn mime_from_extension(path: &Path) -> Option<&'static str> {
    let ext = path.extension().and_then(|value| value.to_str())?;

    let mime = match ext.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "tif" | "tiff" => "image/tiff",
        "webp" => "image/webp",
        "heic" => "image/heic",
        "heif" => "image/heif",
        "avif" => "image/avif",
        "jxl" => "image/jxl",
        _ => return None,
    };

    Some(mime)
}

pub fn is_image_mime(mime_type: &str) -> bool {
    mime_type
        .trim()
        .to_ascii_lowercase()
        .starts_with(IMAGE_MIME_PREFIX)
}

pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|value| value.to_str())
        .map(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|supported| supported.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

/// Container type `little_exif` should parse a blob as, judged by its content.
pub fn exif_container(bytes: &[u8]) -> Option<FileExtension> {
    let kind = infer::get(bytes)?;

    match kind.mime_type() {
        "image/jpeg" => Some(FileExtension::JPEG),
        "image/png" => Some(FileExtension::PNG {
            as_zTXt_chunk: true,
        }),
        "image/tiff" => Some(FileExtension::TIFF),
        "image/webp" => Some(FileExtension::WEBP),
        "image/heif" | "image/heic" | "image/avif" => Some(FileExtension::HEIF),
        "image/jxl" => Some(FileExtension::JXL),
        _ => None,
    }
}
