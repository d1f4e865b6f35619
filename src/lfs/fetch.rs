//! Manifest resolution, object download and the local object store.

use std::collections::BTreeMap;
use std::fs;
use std::io::{Read, Write};
use std::path::{Component, Path, PathBuf};

use log::{debug, info};
use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::error::ChipviewError;

use super::pointer::{to_hex, Oid, Pointer};
use super::LfsRemote;

/// A content-addressed reference to one stored object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectRef {
    pub oid: Oid,
    pub size: u64,
}

/// The file tree published for one ref: tree-relative path -> object.
#[derive(Clone, Debug)]
pub struct Manifest {
    pub reference: String,
    pub entries: BTreeMap<String, ObjectRef>,
}

#[derive(Debug, Deserialize)]
struct ManifestDoc {
    #[serde(default)]
    #[allow(dead_code)]
    r#ref: Option<String>,
    files: BTreeMap<String, ManifestEntryDoc>,
}

#[derive(Debug, Deserialize)]
struct ManifestEntryDoc {
    oid: String,
    size: u64,
}

impl Manifest {
    /// Parse the manifest JSON served for a ref.
    pub fn from_json(reference: &str, raw: &str) -> Result<Self, ChipviewError> {
        let doc: ManifestDoc =
            serde_json::from_str(raw).map_err(|source| ChipviewError::LfsManifestParse {
                reference: reference.to_string(),
                message: source.to_string(),
            })?;

        let mut entries = BTreeMap::new();
        for (path, entry) in doc.files {
            if !is_tree_relative(&path) {
                return Err(ChipviewError::LfsManifestParse {
                    reference: reference.to_string(),
                    message: format!("entry '{path}' escapes the checkout tree"),
                });
            }
            let oid = Oid::parse(&entry.oid).map_err(|err| ChipviewError::LfsManifestParse {
                reference: reference.to_string(),
                message: format!("entry '{path}': {err}"),
            })?;
            entries.insert(
                path,
                ObjectRef {
                    oid,
                    size: entry.size,
                },
            );
        }

        Ok(Self {
            reference: reference.to_string(),
            entries,
        })
    }
}

/// Client for one remote repository plus its local object store.
///
/// The store lives under `root`: verified objects in `objects/<hex>`,
/// ad-hoc URI downloads in `fetch/`, and the materialized file tree for
/// the current ref in `tree/`.
pub struct LfsClient {
    remote: LfsRemote,
    root: PathBuf,
}

impl LfsClient {
    pub fn new(remote: LfsRemote, root: impl Into<PathBuf>) -> Result<Self, ChipviewError> {
        let root = root.into();
        fs::create_dir_all(root.join("objects"))?;
        fs::create_dir_all(root.join("fetch"))?;
        fs::create_dir_all(root.join("tree"))?;
        Ok(Self { remote, root })
    }

    /// Directory the current ref's files are materialized into.
    pub fn tree_dir(&self) -> PathBuf {
        self.root.join("tree")
    }

    /// Resolve the manifest for the configured ref.
    pub fn manifest(&self) -> Result<Manifest, ChipviewError> {
        let url = format!(
            "{}/manifests/{}.json",
            self.remote.base(),
            self.remote.reference
        );
        debug!("resolving manifest from {url}");

        let mut response = ureq::get(&url)
            .call()
            .map_err(|source| ChipviewError::LfsFetch {
                url: url.clone(),
                message: source.to_string(),
            })?;
        let raw = response
            .body_mut()
            .read_to_string()
            .map_err(|source| ChipviewError::LfsFetch {
                url: url.clone(),
                message: source.to_string(),
            })?;

        Manifest::from_json(&self.remote.reference, &raw)
    }

    /// Materialize every manifest entry accepted by `keep` into the tree
    /// directory, fetching missing objects on the way. Returns the tree path.
    pub fn checkout(
        &self,
        manifest: &Manifest,
        keep: impl Fn(&str) -> bool,
    ) -> Result<PathBuf, ChipviewError> {
        let tree = self.tree_dir();

        let mut fetched = 0usize;
        for (path, object) in &manifest.entries {
            if !keep(path) {
                continue;
            }

            let cached = self.ensure_object(path, object)?;
            let dest = tree.join(path);
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            if !dest.is_file() {
                fs::copy(&cached, &dest)?;
            }
            fetched += 1;
        }

        info!(
            "checked out {fetched} file(s) for ref '{}' into {}",
            manifest.reference,
            tree.display()
        );
        Ok(tree)
    }

    /// Fetch an arbitrary URI into the store and return its local path.
    ///
    /// A body that turns out to be an LFS pointer file is resolved through
    /// the object store, so callers always get the real content.
    pub fn get(&self, uri: &str) -> Result<PathBuf, ChipviewError> {
        let dest = self.root.join("fetch").join(uri_cache_name(uri));
        if !dest.is_file() {
            let mut response = ureq::get(uri)
                .call()
                .map_err(|source| ChipviewError::LfsFetch {
                    url: uri.to_string(),
                    message: source.to_string(),
                })?;
            let mut reader = response.body_mut().as_reader();
            write_staged(&dest, &mut reader)?;
        }

        let head = read_head(&dest)?;
        if Pointer::looks_like_pointer(&head) {
            let text = fs::read_to_string(&dest)?;
            let pointer = Pointer::parse(&text)?;
            let object = ObjectRef {
                oid: pointer.oid,
                size: pointer.size,
            };
            return self.ensure_object(uri, &object);
        }

        Ok(dest)
    }

    /// Return the cached path for an object, downloading and verifying it
    /// if it is not in the store yet. `name` is only used in error messages.
    fn ensure_object(&self, name: &str, object: &ObjectRef) -> Result<PathBuf, ChipviewError> {
        let cached = self.root.join("objects").join(object.oid.hex());
        if cached.is_file() {
            return Ok(cached);
        }

        let url = self.object_url(&object.oid);
        debug!("fetching object {} from {url}", object.oid);

        let mut response = ureq::get(&url)
            .call()
            .map_err(|source| ChipviewError::LfsFetch {
                url: url.clone(),
                message: source.to_string(),
            })?;
        let mut reader = response.body_mut().as_reader();
        self.store_verified(name, object, &mut reader)
    }

    /// Stream `reader` into the object store, verifying digest and size
    /// against `object` before the file becomes visible under its oid.
    fn store_verified(
        &self,
        name: &str,
        object: &ObjectRef,
        reader: &mut impl Read,
    ) -> Result<PathBuf, ChipviewError> {
        let final_path = self.root.join("objects").join(object.oid.hex());
        let staging = self
            .root
            .join("objects")
            .join(format!(".partial-{}", object.oid.hex()));

        let mut file = fs::File::create(&staging)?;
        let mut hasher = Sha256::new();
        let mut total: u64 = 0;
        let mut buf = [0u8; 64 * 1024];

        loop {
            let n = reader.read(&mut buf)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
            file.write_all(&buf[..n])?;
            total += n as u64;
        }
        file.flush()?;
        drop(file);

        let actual = to_hex(&hasher.finalize());
        if actual != object.oid.hex() {
            fs::remove_file(&staging)?;
            return Err(ChipviewError::ObjectVerify {
                name: name.to_string(),
                expected: object.oid.to_string(),
                actual: format!("sha256:{actual}"),
            });
        }
        if total != object.size {
            fs::remove_file(&staging)?;
            return Err(ChipviewError::ObjectVerify {
                name: name.to_string(),
                expected: format!("{} bytes", object.size),
                actual: format!("{total} bytes"),
            });
        }

        fs::rename(&staging, &final_path)?;
        Ok(final_path)
    }

    fn object_url(&self, oid: &Oid) -> String {
        let hex = oid.hex();
        format!("{}/objects/{}/{}", self.remote.base(), &hex[..2], hex)
    }
}

/// A manifest path must stay inside the checkout tree: relative, with no
/// parent-directory or current-directory components.
fn is_tree_relative(path: &str) -> bool {
    let path = Path::new(path);
    !path.as_os_str().is_empty()
        && path
            .components()
            .all(|component| matches!(component, Component::Normal(_)))
}

/// Stream `reader` into `dest` through a sibling staging file. An
/// interrupted body never lands at the cache path, so a later run re-fetches
/// instead of serving a truncated file.
fn write_staged(dest: &Path, reader: &mut impl Read) -> Result<(), ChipviewError> {
    let name = dest
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("download");
    let staging = dest.with_file_name(format!(".partial-{name}"));

    let mut file = fs::File::create(&staging)?;
    let copied = std::io::copy(reader, &mut file).and_then(|_| file.flush());
    drop(file);

    match copied {
        Ok(()) => {
            fs::rename(&staging, dest)?;
            Ok(())
        }
        Err(err) => {
            let _ = fs::remove_file(&staging);
            Err(err.into())
        }
    }
}

/// Stable cache file name for an ad-hoc URI download: digest of the URI,
/// keeping the original extension so format sniffing by name still works.
fn uri_cache_name(uri: &str) -> String {
    let digest = to_hex(&Sha256::digest(uri.as_bytes()));
    match Path::new(uri).extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.chars().all(|c| c.is_ascii_alphanumeric()) => {
            format!("{digest}.{ext}")
        }
        _ => digest,
    }
}

fn read_head(path: &Path) -> Result<Vec<u8>, ChipviewError> {
    let mut file = fs::File::open(path)?;
    let mut head = vec![0u8; 64];
    let mut filled = 0;
    loop {
        let n = file.read(&mut head[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
        if filled == head.len() {
            break;
        }
    }
    head.truncate(filled);
    Ok(head)
}
