use chrono::Utc;
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

use crate::errors::GatewayError;

const IMAGE_EXTENSIONS: [&str; 4] = [".png", ".jpg", ".jpeg", ".webp"];
pub const DEFAULT_EXTENSION: &str = ".png";
const DEFAULT_LABEL: &str = "image";

// Keep only [A-Za-z0-9_- ], then turn spaces into underscores.
pub fn sanitize_segment(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | ' '))
        .map(|c| if c == ' ' { '_' } else { c })
        .collect()
}

pub fn sanitize_or(raw: &str, fallback: &str) -> String {
    let clean = sanitize_segment(raw);
    if clean.is_empty() {
        sanitize_segment(fallback)
    } else {
        clean
    }
}

// Collapse every run of characters outside [A-Za-z0-9_-] into a single '-'.
pub fn slugify(text: &str, max_len: usize) -> String {
    let mut slug = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
            slug.push(c);
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.contains("--") {
        slug = slug.replace("--", "-");
    }
    slug.trim_matches('-').chars().take(max_len).collect()
}

/// Extension of the URL's last path segment, ignoring query and fragment.
/// Anything outside png/jpg/jpeg/webp becomes `.png`.
pub fn extension_from_url(url: &str) -> &'static str {
    let path = url.split(['?', '#']).next().unwrap_or("");
    let last_segment = path.rsplit('/').next().unwrap_or("");
    let ext = match last_segment.rfind('.') {
        Some(idx) if idx > 0 => last_segment[idx..].to_ascii_lowercase(),
        _ => return DEFAULT_EXTENSION,
    };
    IMAGE_EXTENSIONS
        .iter()
        .find(|known| **known == ext)
        .copied()
        .unwrap_or(DEFAULT_EXTENSION)
}

// Writes artifacts under `{root}/{namespace...}/{label}_{unix_ts}{ext}`.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        ArtifactStore { root: root.into() }
    }

    // Components that sanitize to nothing are skipped.
    pub fn directory_for(&self, namespace: &[&str]) -> PathBuf {
        namespace
            .iter()
            .map(|segment| sanitize_segment(segment))
            .filter(|segment| !segment.is_empty())
            .fold(self.root.clone(), |dir, segment| dir.join(segment))
    }

    pub async fn save(&self, bytes: &[u8], namespace: &[&str], label: &str, extension: &str) -> Result<PathBuf, GatewayError> {
        self.save_at(bytes, namespace, label, extension, Utc::now().timestamp()).await
    }

    /// Same as [`save`](Self::save) with an explicit timestamp. An existing file is
    /// never overwritten: a `_{n}` counter is appended until the name is free.
    pub async fn save_at(
        &self,
        bytes: &[u8],
        namespace: &[&str],
        label: &str,
        extension: &str,
        timestamp: i64,
    ) -> Result<PathBuf, GatewayError> {
        let dir = self.directory_for(namespace);
        fs::create_dir_all(&dir)
            .await
            .map_err(|err| GatewayError::Persistence(format!("could not create output directory {:?}: {}", dir, err)))?;

        let label = sanitize_or(label, DEFAULT_LABEL);
        let mut counter = 0u32;
        loop {
            let filename = if counter == 0 {
                format!("{}_{}{}", label, timestamp, extension)
            } else {
                format!("{}_{}_{}{}", label, timestamp, counter, extension)
            };
            let path = dir.join(filename);

            match OpenOptions::new().write(true).create_new(true).open(&path).await {
                Ok(mut file) => {
                    file.write_all(bytes)
                        .await
                        .map_err(|err| GatewayError::Persistence(format!("{:?}: {}", path, err)))?;
                    file.flush()
                        .await
                        .map_err(|err| GatewayError::Persistence(format!("{:?}: {}", path, err)))?;
                    return Ok(path);
                }
                Err(err) if err.kind() == ErrorKind::AlreadyExists => counter += 1,
                Err(err) => return Err(GatewayError::Persistence(format!("{:?}: {}", path, err))),
            }
        }
    }
}
