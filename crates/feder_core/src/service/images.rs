//! Image resolution for the preview.
//!
//! # Invariants
//! - External sources (`http:`, `https:`, `blob:`, `data:`) are never read
//!   from storage.
//! - A cached resource is dropped as soon as no rendered image references it.
//! - A bare file name missing from the project root is looked up in the
//!   figures folder.

use crate::render::tree::{ImageRef, RenderedDocument};
use crate::storage::{join_path, normalize_path, Storage, StorageResult};
use log::{debug, warn};
use std::collections::{BTreeMap, BTreeSet};

/// Image bytes read from the project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageResource {
    pub bytes: Vec<u8>,
    pub mime: &'static str,
}

/// How the view should display one image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedImage<'a> {
    /// Load `src` directly.
    External(&'a str),
    Resource(&'a ImageResource),
    /// Lookup failed; the view shows `src` as-is.
    Unavailable,
}

/// Per-source cache of resolved project images.
#[derive(Debug, Default)]
pub struct ImageCache {
    resources: BTreeMap<String, ImageResource>,
}

impl ImageCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Resolves `image`, reading project files through `storage`.
    ///
    /// `figures_folder` is tried for sources without a folder component.
    pub fn resolve<'a, S: Storage>(
        &'a mut self,
        storage: &S,
        image: &'a ImageRef,
        figures_folder: Option<&str>,
    ) -> ResolvedImage<'a> {
        if image.external || ImageRef::is_external_src(&image.src) {
            return ResolvedImage::External(&image.src);
        }

        let Some(key) = cache_key(&image.src) else {
            warn!(
                "event=image_resolve module=service status=error reason=invalid_path src={}",
                image.src
            );
            return ResolvedImage::Unavailable;
        };

        if !self.resources.contains_key(&key) {
            match read_image(storage, &key, figures_folder) {
                Ok((path, bytes)) => {
                    debug!(
                        "event=image_resolve module=service status=ok src={} path={} bytes={}",
                        key,
                        path,
                        bytes.len()
                    );
                    let mime = mime_for(&key);
                    self.resources.insert(key.clone(), ImageResource { bytes, mime });
                }
                Err(err) => {
                    warn!(
                        "event=image_resolve module=service status=error path={} error={}",
                        key, err
                    );
                    return ResolvedImage::Unavailable;
                }
            }
        }

        match self.resources.get(&key) {
            Some(resource) => ResolvedImage::Resource(resource),
            None => ResolvedImage::Unavailable,
        }
    }

    /// Releases resources that `document` no longer shows.
    pub fn retain_referenced(&mut self, document: &RenderedDocument) {
        let referenced: BTreeSet<String> = document
            .images()
            .into_iter()
            .filter(|image| !image.external)
            .filter_map(|image| cache_key(&image.src))
            .collect();
        let before = self.resources.len();
        self.resources.retain(|key, _| referenced.contains(key));
        let released = before - self.resources.len();
        if released > 0 {
            debug!(
                "event=image_release module=service status=ok released={}",
                released
            );
        }
    }

    /// Drops one source, e.g. after the file was replaced.
    pub fn invalidate(&mut self, src: &str) {
        if let Some(key) = cache_key(src) {
            self.resources.remove(&key);
        }
    }

    pub fn clear(&mut self) {
        self.resources.clear();
    }
}

fn read_image<S: Storage>(
    storage: &S,
    key: &str,
    figures_folder: Option<&str>,
) -> StorageResult<(String, Vec<u8>)> {
    match storage.read_document(key) {
        Ok(bytes) => Ok((key.to_string(), bytes)),
        Err(err) => {
            let fallback = figures_folder
                .filter(|folder| !folder.trim().is_empty() && !key.contains('/'))
                .map(|folder| join_path(folder, key));
            match fallback {
                Some(path) => storage.read_document(&path).map(|bytes| (path, bytes)),
                None => Err(err),
            }
        }
    }
}

fn cache_key(src: &str) -> Option<String> {
    let path = src.split(['?', '#']).next().unwrap_or(src);
    let key = normalize_path(path).ok()?;
    (!key.is_empty()).then_some(key)
}

fn mime_for(path: &str) -> &'static str {
    let extension = path
        .rsplit_once('.')
        .map(|(_, extension)| extension.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}
