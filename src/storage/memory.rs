//! In-memory `ObjectStore` used by the unit tests.

use super::{ListOptions, ObjectStore, StorageEntry, UploadOptions};
use crate::error::StorageError;
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub cache_control: Option<String>,
}

#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<BTreeMap<(String, String), StoredObject>>,
    list_calls: AtomicUsize,
    upload_calls: AtomicUsize,
    remove_calls: AtomicUsize,
    fail_uploads: Mutex<BTreeSet<String>>,
    fail_list_prefixes: Mutex<BTreeSet<String>>,
    fail_removes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, bucket: &str, path: &str, bytes: Vec<u8>, content_type: &str) {
        self.objects.lock().unwrap().insert(
            (bucket.to_string(), path.to_string()),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
                cache_control: None,
            },
        );
    }

    pub fn get(&self, bucket: &str, path: &str) -> Option<StoredObject> {
        self.objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), path.to_string()))
            .cloned()
    }

    /// All object paths in `bucket`, sorted
    pub fn paths(&self, bucket: &str) -> Vec<String> {
        self.objects
            .lock()
            .unwrap()
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, p)| p.clone())
            .collect()
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn upload_calls(&self) -> usize {
        self.upload_calls.load(Ordering::SeqCst)
    }

    pub fn remove_calls(&self) -> usize {
        self.remove_calls.load(Ordering::SeqCst)
    }

    /// Uploads to `path` fail with a 500
    pub fn fail_upload_of(&self, path: &str) {
        self.fail_uploads.lock().unwrap().insert(path.to_string());
    }

    /// Listing `prefix` fails with a 500
    pub fn fail_listing_of(&self, prefix: &str) {
        self.fail_list_prefixes.lock().unwrap().insert(prefix.to_string());
    }

    pub fn fail_removes(&self) {
        self.fail_removes.store(true, Ordering::SeqCst);
    }

    fn server_error(message: &str) -> StorageError {
        StorageError::Api {
            status: 500,
            message: message.to_string(),
        }
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn list(
        &self,
        bucket: &str,
        prefix: &str,
        options: ListOptions,
    ) -> Result<Vec<StorageEntry>, StorageError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_list_prefixes.lock().unwrap().contains(prefix) {
            return Err(Self::server_error("listing failed"));
        }

        let dir = if prefix.is_empty() {
            String::new()
        } else {
            format!("{}/", prefix.trim_end_matches('/'))
        };

        // Direct children only; deeper paths collapse into their folder
        let mut children: BTreeMap<String, bool> = BTreeMap::new();
        for (b, path) in self.objects.lock().unwrap().keys() {
            if b != bucket {
                continue;
            }
            if let Some(rest) = path.strip_prefix(&dir) {
                match rest.split_once('/') {
                    Some((folder, _)) => {
                        children.insert(folder.to_string(), true);
                    }
                    None => {
                        children.entry(rest.to_string()).or_insert(false);
                    }
                }
            }
        }

        Ok(children
            .into_iter()
            .skip(options.offset)
            .take(options.limit)
            .map(|(name, is_folder)| {
                if is_folder {
                    StorageEntry::folder(name)
                } else {
                    let id = format!("{}{}", dir, name);
                    StorageEntry::file(name, id)
                }
            })
            .collect())
    }

    async fn download(&self, bucket: &str, path: &str) -> Result<Vec<u8>, StorageError> {
        self.get(bucket, path)
            .map(|object| object.bytes)
            .ok_or_else(|| StorageError::NotFound {
                bucket: bucket.to_string(),
                path: path.to_string(),
            })
    }

    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        options: &UploadOptions,
    ) -> Result<(), StorageError> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_uploads.lock().unwrap().contains(path) {
            return Err(Self::server_error("upload failed"));
        }

        let key = (bucket.to_string(), path.to_string());
        let mut objects = self.objects.lock().unwrap();
        if !options.overwrite && objects.contains_key(&key) {
            return Err(StorageError::Api {
                status: 409,
                message: "The resource already exists".to_string(),
            });
        }
        objects.insert(
            key,
            StoredObject {
                bytes,
                content_type: options.content_type.clone(),
                cache_control: Some(options.cache_control.clone()),
            },
        );
        Ok(())
    }

    async fn remove(&self, bucket: &str, paths: &[String]) -> Result<(), StorageError> {
        self.remove_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_removes.load(Ordering::SeqCst) {
            return Err(Self::server_error("remove failed"));
        }
        let mut objects = self.objects.lock().unwrap();
        for path in paths {
            objects.remove(&(bucket.to_string(), path.clone()));
        }
        Ok(())
    }
}
