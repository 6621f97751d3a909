use std::path::{Component, Path, PathBuf};

use anyhow::{bail, Context};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use sha2::{Digest, Sha256};

pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Where uploads and generated avatars are kept between pipeline runs.
pub trait BlobStore: Send + Sync {
    fn put(&self, name: &str, bytes: &[u8]) -> anyhow::Result<String>;
    fn get(&self, url: &str) -> anyhow::Result<Vec<u8>>;
}

/// Filesystem store: `root/<name>` on disk, `<public_prefix>/<name>` as URL.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
    public_prefix: String,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>, public_prefix: &str) -> Self {
        let trimmed = public_prefix.trim().trim_end_matches('/');
        let public_prefix = if trimmed.starts_with('/') {
            trimmed.to_string()
        } else {
            format!("/{trimmed}")
        };
        Self {
            root: root.into(),
            public_prefix,
        }
    }

    pub fn path_for(&self, name: &str) -> anyhow::Result<PathBuf> {
        let candidate = Path::new(name);
        let plain = candidate
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
        if name.trim().is_empty() || !plain {
            bail!("invalid blob name '{name}'");
        }
        Ok(self.root.join(candidate))
    }
}

impl BlobStore for LocalBlobStore {
    fn put(&self, name: &str, bytes: &[u8]) -> anyhow::Result<String> {
        let path = self.path_for(name)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed creating {}", parent.display()))?;
        }
        std::fs::write(&path, bytes).with_context(|| format!("failed to write {}", path.display()))?;
        Ok(format!("{}/{}", self.public_prefix, name))
    }

    fn get(&self, url: &str) -> anyhow::Result<Vec<u8>> {
        let name = url
            .strip_prefix(&self.public_prefix)
            .map(|rest| rest.trim_start_matches('/'))
            .unwrap_or(url);
        let path = self.path_for(name)?;
        std::fs::read(&path).with_context(|| format!("failed reading {}", path.display()))
    }
}

/// Serverless variant: blobs are inlined as `data:` URLs instead of written.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineBlobStore;

impl BlobStore for InlineBlobStore {
    fn put(&self, name: &str, bytes: &[u8]) -> anyhow::Result<String> {
        let mime = content_type_for_path(Path::new(name));
        Ok(format!("data:{mime};base64,{}", BASE64.encode(bytes)))
    }

    fn get(&self, url: &str) -> anyhow::Result<Vec<u8>> {
        let Some(rest) = url.strip_prefix("data:") else {
            bail!("not a data URL");
        };
        let Some((_, payload)) = rest.split_once(";base64,") else {
            bail!("data URL is not base64 encoded");
        };
        BASE64
            .decode(payload.as_bytes())
            .context("data URL base64 decode failed")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadCheck {
    pub extension: &'static str,
    pub size: usize,
    pub digest: String,
}

pub fn validate_upload(bytes: &[u8]) -> anyhow::Result<UploadCheck> {
    if bytes.is_empty() {
        bail!("upload is empty");
    }
    if bytes.len() > MAX_UPLOAD_BYTES {
        bail!(
            "upload is {} bytes; the limit is {} bytes",
            bytes.len(),
            MAX_UPLOAD_BYTES
        );
    }
    let format = image::guess_format(bytes).context("upload is not a recognised image")?;
    let extension = format.extensions_str().first().copied().unwrap_or("bin");
    Ok(UploadCheck {
        extension,
        size: bytes.len(),
        digest: content_digest(bytes),
    })
}

pub fn content_digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Validates a path handed to the serving endpoint.
pub fn resolve_served_path(raw: &str) -> anyhow::Result<PathBuf> {
    if raw.contains("..") || !raw.starts_with('/') {
        bail!("illegal file path '{raw}'");
    }
    let path = PathBuf::from(raw);
    if !path.exists() {
        bail!("file not found: {raw}");
    }
    Ok(path)
}

pub fn content_type_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|value| value.to_str())
        .map(|value| value.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use image::{Rgb, RgbImage};

    use super::*;

    fn jpeg_bytes() -> anyhow::Result<Vec<u8>> {
        let mut bytes = Vec::new();
        RgbImage::from_pixel(8, 8, Rgb([200, 120, 40]))
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Jpeg)?;
        Ok(bytes)
    }

    #[test]
    fn local_store_round_trips_under_prefix() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let store = LocalBlobStore::new(temp.path().join("generated"), "generated/");
        let url = store.put("generated_1.png", b"payload")?;
        assert_eq!(url, "/generated/generated_1.png");
        assert!(temp.path().join("generated/generated_1.png").exists());
        assert_eq!(store.get(&url)?, b"payload");
        Ok(())
    }

    #[test]
    fn local_store_rejects_escaping_names() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let store = LocalBlobStore::new(temp.path(), "/uploads");
        assert!(store.put("../escape.png", b"x").is_err());
        assert!(store.put("/abs.png", b"x").is_err());
        assert!(store.put("", b"x").is_err());
        Ok(())
    }

    #[test]
    fn inline_store_uses_data_urls() -> anyhow::Result<()> {
        let store = InlineBlobStore;
        let url = store.put("generated_1.png", b"abc")?;
        assert_eq!(url, "data:image/png;base64,YWJj");
        assert_eq!(store.get(&url)?, b"abc");
        assert!(store.get("/generated/x.png").is_err());
        Ok(())
    }

    #[test]
    fn upload_validation_accepts_images_only() -> anyhow::Result<()> {
        let check = validate_upload(&jpeg_bytes()?)?;
        assert_eq!(check.extension, "jpg");
        assert_eq!(check.digest.len(), 64);

        assert!(validate_upload(&[]).is_err());
        assert!(validate_upload(b"definitely not an image").is_err());
        let oversized = vec![0u8; MAX_UPLOAD_BYTES + 1];
        assert!(validate_upload(&oversized).is_err());
        Ok(())
    }

    #[test]
    fn served_paths_must_be_absolute_and_contained() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let file = temp.path().join("cat.PNG");
        std::fs::write(&file, b"x")?;
        let raw = file.to_string_lossy().to_string();

        assert_eq!(resolve_served_path(&raw)?, file);
        assert!(resolve_served_path("relative/cat.png").is_err());
        assert!(resolve_served_path(&format!("{raw}/../cat.png")).is_err());
        assert!(resolve_served_path("/definitely/missing/cat.png").is_err());
        assert_eq!(content_type_for_path(&file), "image/png");
        assert_eq!(content_type_for_path(Path::new("a.jpeg")), "image/jpeg");
        assert_eq!(content_type_for_path(Path::new("a.bin")), "application/octet-stream");
        Ok(())
    }
}
