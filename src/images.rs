//! Moving embedded images in and out of Markdown files.
//!
//! Google Docs exports images as `data:image/...;base64,...` URIs, which
//! bloat a Markdown file and make diffs unreadable. [`extract_images`] moves
//! them into a sibling `imgs/` directory under content-addressed names;
//! [`inline_images`] turns `[imageN]: <path>` reference lines back into data
//! URIs before an upload.
//!
//! File I/O here is blocking `std::fs`; rewrites of the Markdown file use
//! the same temp-file-and-rename write as downloads.

use crate::convert::write_atomic_blocking;
use crate::error::GdocsError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Directory, relative to the Markdown file, that extracted images go to.
pub const IMAGES_DIR: &str = "imgs";

/// Hex characters of the SHA-256 used in file names before collisions force more.
const HASH_PREFIX_LEN: usize = 5;

static DATA_URI: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"data:(?P<mime>image/[-\w.+]+);base64,(?P<b64>[A-Za-z0-9+/=\s]+)").unwrap()
});

static IMAGE_REF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\[(?P<label>image\d+)\]:\s*<(?P<path>[^>]+)>$").unwrap());

/// What [`extract_images`] did.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExtractReport {
    /// Data URIs found in the file.
    pub found: usize,
    /// Distinct images among them.
    pub unique: usize,
    /// Image files newly written (existing identical files are reused).
    pub written: Vec<PathBuf>,
    pub images_dir: PathBuf,
    /// Whether the Markdown file was rewritten.
    pub rewritten: bool,
}

/// What [`inline_images`] did.
#[derive(Debug, Clone, Default, Serialize)]
pub struct InlineReport {
    /// Labels now carrying a data URI, in numeric order.
    pub inlined: Vec<String>,
    /// Referenced files that do not exist or could not be read.
    pub missing: Vec<PathBuf>,
    pub rewritten: bool,
}

/// Move every base64 data-URI image of `md_path` into `imgs/`.
///
/// Each distinct image is written once as `imgs/img-<sha256 prefix>.<ext>`
/// and every URI is replaced by that relative path. With `rewrite` false the
/// images are still exported but the Markdown file is left untouched.
pub fn extract_images(md_path: &Path, rewrite: bool) -> Result<ExtractReport, GdocsError> {
    let text = read_text(md_path)?;
    let images_dir = md_dir(md_path).join(IMAGES_DIR);
    let mut report = ExtractReport {
        images_dir: images_dir.clone(),
        ..Default::default()
    };

    // full hex digest → relative path
    let mut replacements: HashMap<String, String> = HashMap::new();
    let mut out = String::with_capacity(text.len());
    let mut last = 0;

    for caps in DATA_URI.captures_iter(&text) {
        let (Some(whole), Some(mime), Some(payload)) = (caps.get(0), caps.name("mime"), caps.name("b64")) else {
            continue;
        };
        let mime = mime.as_str();
        let raw = payload.as_str();
        let trailing = &raw[raw.trim_end().len()..];

        let data = decode_payload(mime, raw)?;
        let digest = hex::encode(Sha256::digest(&data));

        let relative = match replacements.get(&digest) {
            Some(rel) => rel.clone(),
            None => {
                std::fs::create_dir_all(&images_dir).map_err(|e| GdocsError::OutputWriteFailed {
                    path: images_dir.clone(),
                    source: e,
                })?;
                let ext = extension_for(mime, &data);
                let path = choose_image_path(&images_dir, &digest, &ext, &data)?;
                if !path.exists() {
                    std::fs::write(&path, &data).map_err(|e| GdocsError::OutputWriteFailed {
                        path: path.clone(),
                        source: e,
                    })?;
                    debug!("Wrote {}", path.display());
                    report.written.push(path.clone());
                }
                let file_name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let rel = format!("{IMAGES_DIR}/{file_name}");
                replacements.insert(digest, rel.clone());
                rel
            }
        };

        out.push_str(&text[last..whole.start()]);
        out.push_str(&relative);
        out.push_str(trailing);
        last = whole.end();
        report.found += 1;
    }
    out.push_str(&text[last..]);
    report.unique = replacements.len();

    if rewrite && report.found > 0 && out != text {
        write_atomic_blocking(md_path, &out)?;
        report.rewritten = true;
    }

    info!(
        "Found {} embedded image(s); exported {} unique image(s) to {}",
        report.found,
        report.unique,
        images_dir.display()
    );
    Ok(report)
}

/// Replace `[imageN]: <path>` reference lines with data-URI references.
///
/// The old reference lines are removed and the new ones appended at the end
/// of the file, sorted by N. References whose file is missing are reported
/// and left in place.
pub fn inline_images(md_path: &Path, rewrite: bool) -> Result<InlineReport, GdocsError> {
    let text = read_text(md_path)?;
    let dir = md_dir(md_path);
    let mut report = InlineReport::default();

    let mut removed: HashSet<&str> = HashSet::new();
    let mut data_refs: BTreeMap<(u64, String), String> = BTreeMap::new();

    for caps in IMAGE_REF.captures_iter(&text) {
        let (Some(line), Some(label), Some(target)) = (caps.get(0), caps.name("label"), caps.name("path")) else {
            continue;
        };
        let target = target.as_str();
        if target.starts_with("data:") {
            continue;
        }

        let path = dir.join(target);
        let data = match std::fs::read(&path) {
            Ok(data) => data,
            Err(e) => {
                warn!("Image file not usable: {} ({})", path.display(), e);
                report.missing.push(path);
                continue;
            }
        };

        let label = label.as_str();
        let mime = mime_for(&path, &data);
        let reference = format!("[{label}]: <data:{mime};base64,{}>", STANDARD.encode(&data));
        data_refs.insert((label_number(label), label.to_string()), reference);
        removed.insert(line.as_str());
    }

    if data_refs.is_empty() {
        info!("No image references found to inline");
        return Ok(report);
    }

    let mut out: String = text
        .split_inclusive('\n')
        .filter(|l| !removed.contains(l.trim_end_matches('\n')))
        .collect();
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
    for ((_, label), reference) in data_refs {
        out.push_str(&reference);
        out.push('\n');
        report.inlined.push(label);
    }

    if rewrite && out != text {
        write_atomic_blocking(md_path, &out)?;
        report.rewritten = true;
    }
    info!("Inlined {} image(s) as data URIs", report.inlined.len());
    Ok(report)
}

/// File extension (without dot) for an image MIME type.
///
/// Unknown subtypes are sniffed from the bytes, then fall back to the subtype itself.
pub fn extension_for(mime: &str, data: &[u8]) -> String {
    let subtype = mime.split_once('/').map_or(mime, |(_, s)| s).to_ascii_lowercase();
    let known = match subtype.as_str() {
        "png" => Some("png"),
        "jpeg" | "jpg" | "pjpeg" => Some("jpg"),
        "gif" => Some("gif"),
        "webp" => Some("webp"),
        "svg+xml" => Some("svg"),
        "bmp" => Some("bmp"),
        "tiff" => Some("tiff"),
        "x-icon" | "vnd.microsoft.icon" => Some("ico"),
        _ => None,
    };
    if let Some(ext) = known {
        return ext.to_string();
    }
    if let Some(ext) = image::guess_format(data)
        .ok()
        .and_then(|f| f.extensions_str().first().copied())
    {
        return ext.to_string();
    }
    subtype
}

fn mime_for(path: &Path, data: &[u8]) -> String {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    let by_ext = match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "svg" => Some("image/svg+xml"),
        "bmp" => Some("image/bmp"),
        "tif" | "tiff" => Some("image/tiff"),
        "ico" => Some("image/x-icon"),
        _ => None,
    };
    by_ext
        .map(str::to_string)
        .or_else(|| image::guess_format(data).ok().map(|f| f.to_mime_type().to_string()))
        .unwrap_or_else(|| "image/png".to_string())
}

fn decode_payload(mime: &str, raw: &str) -> Result<Vec<u8>, GdocsError> {
    let cleaned: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD.decode(cleaned).map_err(|e| GdocsError::ImageDecode {
        mime: mime.to_string(),
        detail: e.to_string(),
    })
}

/// Pick `img-<prefix>.<ext>` for `data`, growing the prefix past collisions.
///
/// An existing file holding the same bytes is reused.
fn choose_image_path(dir: &Path, digest: &str, ext: &str, data: &[u8]) -> Result<PathBuf, GdocsError> {
    let usable = |candidate: &Path| -> bool {
        !candidate.exists() || std::fs::read(candidate).is_ok_and(|existing| existing == data)
    };

    for n in HASH_PREFIX_LEN..=digest.len() {
        let candidate = dir.join(format!("img-{}.{ext}", &digest[..n]));
        if usable(&candidate) {
            return Ok(candidate);
        }
    }
    for i in 2..10_000 {
        let candidate = dir.join(format!("img-{digest}-{i}.{ext}"));
        if usable(&candidate) {
            return Ok(candidate);
        }
    }
    Err(GdocsError::Internal(format!(
        "Unable to choose a unique file name for image {digest} in {}",
        dir.display()
    )))
}

fn label_number(label: &str) -> u64 {
    label
        .trim_start_matches(|c: char| !c.is_ascii_digit())
        .parse()
        .unwrap_or(0)
}

fn md_dir(md_path: &Path) -> &Path {
    md_path.parent().unwrap_or_else(|| Path::new(""))
}

fn read_text(path: &Path) -> Result<String, GdocsError> {
    if !path.is_file() {
        return Err(GdocsError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    let bytes = std::fs::read(path).map_err(|e| GdocsError::ReadFailed {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_1X1: &[u8] = &[
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52,
    ];

    fn data_uri(mime: &str, data: &[u8]) -> String {
        format!("data:{mime};base64,{}", STANDARD.encode(data))
    }

    fn md_file(dir: &Path, text: &str) -> PathBuf {
        let path = dir.join("doc.md");
        std::fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn extract_dedupes_and_rewrites() {
        let dir = tempfile::tempdir().unwrap();
        let a = data_uri("image/png", PNG_1X1);
        let b = data_uri("image/gif", b"GIF89a-other-bytes");
        let md = md_file(
            dir.path(),
            &format!("# Pics\n[image1]: <{a}>\n[image2]: <{a}>\n[image3]: <{b}>\n"),
        );

        let report = extract_images(&md, true).unwrap();
        assert_eq!(report.found, 3);
        assert_eq!(report.unique, 2);
        assert_eq!(report.written.len(), 2);
        assert!(report.rewritten);

        let digest = hex::encode(Sha256::digest(PNG_1X1));
        let expected = format!("imgs/img-{}.png", &digest[..5]);
        let text = std::fs::read_to_string(&md).unwrap();
        assert!(text.contains(&format!("[image1]: <{expected}>\n[image2]: <{expected}>\n")));
        assert!(!text.contains("base64"));
        assert_eq!(std::fs::read(dir.path().join(&expected)).unwrap(), PNG_1X1);
    }

    #[test]
    fn extract_without_rewrite_leaves_markdown() {
        let dir = tempfile::tempdir().unwrap();
        let original = format!("![x]({})\n", data_uri("image/png", PNG_1X1));
        let md = md_file(dir.path(), &original);

        let report = extract_images(&md, false).unwrap();
        assert_eq!(report.found, 1);
        assert!(!report.rewritten);
        assert_eq!(std::fs::read_to_string(&md).unwrap(), original);
        assert_eq!(report.written.len(), 1);
    }

    #[test]
    fn extract_tolerates_wrapped_payload() {
        let dir = tempfile::tempdir().unwrap();
        let encoded = STANDARD.encode(PNG_1X1);
        let (head, tail) = encoded.split_at(8);
        let md = md_file(dir.path(), &format!("![x](data:image/png;base64,{head}\n  {tail})\n"));
        let report = extract_images(&md, true).unwrap();
        assert_eq!(report.unique, 1);
        assert_eq!(std::fs::read(&report.written[0]).unwrap(), PNG_1X1);
    }

    #[test]
    fn extract_keeps_space_before_image_title() {
        let dir = tempfile::tempdir().unwrap();
        let md = md_file(dir.path(), &format!("![x]({} \"Logo\")\n", data_uri("image/png", PNG_1X1)));
        extract_images(&md, true).unwrap();
        let text = std::fs::read_to_string(&md).unwrap();
        assert!(text.ends_with(".png \"Logo\")\n"), "{text:?}");
    }

    #[test]
    fn extract_reports_bad_base64() {
        let dir = tempfile::tempdir().unwrap();
        let md = md_file(dir.path(), "![x](data:image/png;base64,abc)\n");
        assert!(matches!(
            extract_images(&md, true),
            Err(GdocsError::ImageDecode { mime, .. }) if mime == "image/png"
        ));
    }

    #[test]
    fn prefix_grows_on_collision() {
        let dir = tempfile::tempdir().unwrap();
        let digest = hex::encode(Sha256::digest(PNG_1X1));
        std::fs::write(dir.path().join(format!("img-{}.png", &digest[..5])), b"other").unwrap();

        let path = choose_image_path(dir.path(), &digest, "png", PNG_1X1).unwrap();
        assert_eq!(path, dir.path().join(format!("img-{}.png", &digest[..6])));
    }

    #[test]
    fn missing_markdown_file() {
        assert!(matches!(
            extract_images(Path::new("/no/such/file.md"), true),
            Err(GdocsError::FileNotFound { .. })
        ));
    }

    #[test]
    fn extension_mapping() {
        assert_eq!(extension_for("image/jpeg", b""), "jpg");
        assert_eq!(extension_for("image/svg+xml", b""), "svg");
        assert_eq!(extension_for("image/x-icon", b""), "ico");
        assert_eq!(extension_for("image/x-unknown", PNG_1X1), "png");
        assert_eq!(extension_for("image/x-unknown", b"??"), "x-unknown");
    }

    #[test]
    fn inline_replaces_references_sorted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("imgs")).unwrap();
        std::fs::write(dir.path().join("imgs/a.png"), PNG_1X1).unwrap();
        std::fs::write(dir.path().join("imgs/b.jpg"), b"jpeg-bytes").unwrap();
        let md = md_file(
            dir.path(),
            "Intro\n[image10]: <imgs/b.jpg>\nMiddle\n[image2]: <imgs/a.png>\nEnd",
        );

        let report = inline_images(&md, true).unwrap();
        assert_eq!(report.inlined, vec!["image2", "image10"]);
        assert!(report.rewritten);

        let text = std::fs::read_to_string(&md).unwrap();
        let expected = format!(
            "Intro\nMiddle\nEnd\n[image2]: <{}>\n[image10]: <{}>\n",
            data_uri("image/png", PNG_1X1),
            data_uri("image/jpeg", b"jpeg-bytes"),
        );
        assert_eq!(text, expected);
    }

    #[test]
    fn inline_reports_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let original = "[image1]: <imgs/gone.png>\n";
        let md = md_file(dir.path(), original);

        let report = inline_images(&md, true).unwrap();
        assert!(report.inlined.is_empty());
        assert_eq!(report.missing, vec![dir.path().join("imgs/gone.png")]);
        assert_eq!(std::fs::read_to_string(&md).unwrap(), original);
    }

    #[test]
    fn extract_then_inline_restores_data_uri() {
        let dir = tempfile::tempdir().unwrap();
        let uri = data_uri("image/png", PNG_1X1);
        let md = md_file(dir.path(), &format!("Text\n[image1]: <{uri}>\n"));

        extract_images(&md, true).unwrap();
        inline_images(&md, true).unwrap();
        assert_eq!(std::fs::read_to_string(&md).unwrap(), format!("Text\n[image1]: <{uri}>\n"));
    }
}
