//! The crate's entry point: wires pacers, auth, gateway, resolver and dir
//! cache into the host filesystem contract operations (spec §6) the
//! synchronization engine drives this backend through.

use std::sync::Arc;

use reqwest::Client;

use crate::auth::{AuthSession, NullTokenStore, TokenStore};
use crate::client::HttpClientBuilder;
use crate::config::{EncodingPolicy, Pan123Config};
use crate::download::{self, DownloadedFile};
use crate::error::{Pan123Error, Result};
use crate::gateway::Gateway;
use crate::model::{DirectoryEntry, RemoteObject};
use crate::name;
use crate::pacer::PacerPool;
use crate::resolver::Resolver;
use crate::upload::{self, PutRequest, UploadSource};
use crate::vfs::{DirCache, InMemoryDirCache, NoopProgressSink, ProgressSink, RemoteFs};

/// One authenticated connection to a 123 Pan account, and the object
/// callers drive `List`/`Put`/`Open`/etc. through.
pub struct Pan123Session {
    http: Client,
    gateway: Arc<Gateway>,
    resolver: Resolver,
    dir_cache: Arc<dyn DirCache>,
    progress: Arc<dyn ProgressSink>,
    max_upload_parts: u32,
    root_id: i64,
    encoding: EncodingPolicy,
}

impl Pan123Session {
    pub fn new(config: Pan123Config) -> Result<Self> {
        Self::with_collaborators(
            config,
            Arc::new(NullTokenStore),
            Arc::new(InMemoryDirCache::new()),
            Arc::new(NoopProgressSink),
        )
    }

    pub fn with_collaborators(
        config: Pan123Config,
        token_store: Arc<dyn TokenStore>,
        dir_cache: Arc<dyn DirCache>,
        progress: Arc<dyn ProgressSink>,
    ) -> Result<Self> {
        let http = HttpClientBuilder::new(&config.user_agent).build()?;
        let auth = AuthSession::new(
            config.client_id.clone(),
            config.client_secret.clone(),
            config.user_agent.clone(),
            http.clone(),
            config.token.clone(),
            token_store,
        );
        let pacers = Arc::new(PacerPool::new(&config));
        let mut gateway = Gateway::new(http.clone(), auth, pacers, config.user_agent.clone());
        if let Some(host) = config.control_host_override.as_deref() {
            gateway = gateway.with_control_host(host);
        }
        let gateway = Arc::new(gateway);
        let root_id = config.root_folder_id_numeric();
        let resolver = Resolver::new(Arc::clone(&gateway), Arc::clone(&dir_cache), root_id);

        Ok(Self {
            http,
            gateway,
            resolver,
            dir_cache,
            progress,
            max_upload_parts: config.max_upload_parts,
            root_id,
            encoding: config.encoding,
        })
    }

    /// `NewObject(remote) -> object | NotFound`.
    pub async fn new_object(&self, path: &str) -> Result<Option<RemoteObject>> {
        let id = match self.resolver.path_to_file_id(path).await {
            Ok(id) => id,
            Err(Pan123Error::NotFound(_)) => return Ok(None),
            Err(e) => return Err(e),
        };
        let entry = crate::api::detail::file_detail(&self.gateway, id).await?;
        if entry.is_trashed() {
            return Ok(None);
        }
        Ok(Some(RemoteObject::from_entry(&entry, path)))
    }

    /// `List(dir) -> entries`, trashed entries filtered.
    pub async fn list(&self, dir_path: &str) -> Result<Vec<DirectoryEntry>> {
        let parent_id = self.path_to_id_or_root(dir_path).await?;
        let mut entries = Vec::new();
        let mut query = crate::api::list::ListQuery::first_page(parent_id);
        loop {
            let page = crate::api::list::list_page(&self.gateway, &query).await?;
            entries.extend(page.file_list.into_iter().filter(|e| !e.is_trashed()));
            if page.last_file_id == crate::constant::LIST_LAST_PAGE_MARKER {
                break;
            }
            query = crate::api::list::ListQuery::next_page(parent_id, page.last_file_id);
        }
        Ok(entries)
    }

    /// `Put(reader, info) -> object`: validates/cleans the filename,
    /// uniquifies on conflict, then dispatches to the upload strategy.
    pub async fn put(
        &self,
        dir_path: &str,
        desired_filename: &str,
        etag: &str,
        source: &UploadSource,
    ) -> Result<i64> {
        let parent_id = self.path_to_id_or_root(dir_path).await?;

        let desired_filename = name::apply_encoding(desired_filename, self.encoding);
        let filename = match name::validate(&desired_filename) {
            Ok(()) => desired_filename.clone(),
            Err(e) => {
                tracing::warn!("auto-cleaning invalid filename '{desired_filename}': {e}");
                name::clean(&desired_filename)
            }
        };
        let filename = name::uniquify(&self.gateway, parent_id, &filename).await?;

        let request = PutRequest {
            parent_file_id: parent_id,
            parent_path: dir_path,
            filename: &filename,
            etag,
            max_upload_parts: self.max_upload_parts,
            root_id: self.root_id,
        };
        upload::put(&self.gateway, &self.dir_cache, &self.progress, &request, source).await
    }

    /// `Update(object, reader, info)`: re-upload in place, same as `Put`
    /// against the existing parent with `duplicate=1` letting the server
    /// replace the prior content-addressed object.
    pub async fn update(
        &self,
        dir_path: &str,
        filename: &str,
        etag: &str,
        source: &UploadSource,
    ) -> Result<i64> {
        let parent_id = self.path_to_id_or_root(dir_path).await?;
        let request = PutRequest {
            parent_file_id: parent_id,
            parent_path: dir_path,
            filename,
            etag,
            max_upload_parts: self.max_upload_parts,
            root_id: self.root_id,
        };
        upload::put(&self.gateway, &self.dir_cache, &self.progress, &request, source).await
    }

    /// Cross-provider `Put`: materializes `remote_path` on `source_fs`
    /// before uploading (spec §4.J).
    pub async fn put_from_remote(
        &self,
        source_fs: &Arc<dyn RemoteFs>,
        remote_path: &str,
        dir_path: &str,
        filename: &str,
    ) -> Result<i64> {
        let parent_id = self.path_to_id_or_root(dir_path).await?;
        let request = PutRequest {
            parent_file_id: parent_id,
            parent_path: dir_path,
            filename,
            etag: "",
            max_upload_parts: self.max_upload_parts,
            root_id: self.root_id,
        };
        crate::upload::orchestrator::materialize_then_upload(
            &self.gateway,
            &self.dir_cache,
            &self.progress,
            source_fs,
            remote_path,
            &request,
        )
        .await
    }

    /// `Open(object) -> readCloser`: whole or parallel ranged download
    /// depending on size, per spec §4.K.
    pub async fn open(&self, file_id: i64, size: u64) -> Result<DownloadedFile> {
        download::open(&self.gateway, &self.http, &self.progress, file_id, size).await
    }

    /// `Remove(object)`: moves to trash (the only delete this API exposes).
    pub async fn remove(&self, file_id: i64) -> Result<()> {
        crate::api::trash::trash(&self.gateway, vec![file_id]).await
    }

    /// `Mkdir(dir)`: creates the final path segment under its resolved
    /// parent, tolerating a pre-existing directory of the same name.
    pub async fn mkdir(&self, dir_path: &str) -> Result<i64> {
        let (parent_path, name) = split_parent(dir_path);
        let parent_id = self.path_to_id_or_root(parent_path).await?;

        match crate::api::mkdir::mkdir(&self.gateway, parent_id, name).await {
            Ok(data) => {
                self.dir_cache.put(dir_path, data.dir_id);
                Ok(data.dir_id)
            }
            Err(Pan123Error::Api { code: 1, message })
                if message.contains(crate::constant::DUPLICATE_DIR_MARKER) =>
            {
                self.dir_cache.invalidate(parent_path);
                let id = self.resolver.path_to_file_id(dir_path).await?;
                Ok(id)
            }
            Err(e) => Err(e),
        }
    }

    /// `Rmdir`/`Purge(dir)`: both trash the directory; this API has no
    /// separate "only if empty" semantics to honor.
    pub async fn rmdir(&self, dir_path: &str) -> Result<()> {
        let id = self.resolver.path_to_file_id(dir_path).await?;
        self.dir_cache.invalidate(dir_path);
        self.remove(id).await
    }

    /// `Move(object, new_parent)`.
    pub async fn move_object(&self, file_id: i64, new_parent_path: &str) -> Result<()> {
        let new_parent_id = self.path_to_id_or_root(new_parent_path).await?;
        crate::api::move_file::move_file(&self.gateway, vec![file_id], new_parent_id).await
    }

    /// `DirMove`/rename of the final path segment.
    pub async fn rename(&self, file_id: i64, new_name: &str) -> Result<()> {
        let new_name = name::apply_encoding(new_name, self.encoding);
        name::validate(&new_name)?;
        crate::api::rename::rename(&self.gateway, file_id, &new_name).await
    }

    /// `Copy`: emulated by download+upload since the API has no
    /// server-side copy (spec §1 Non-goals).
    pub async fn copy(
        &self,
        file_id: i64,
        size: u64,
        dest_dir: &str,
        dest_name: &str,
    ) -> Result<i64> {
        let downloaded = self.open(file_id, size).await?;
        let handle = Arc::new(downloaded.file().try_clone().map_err(Pan123Error::Io)?);
        let etag = compute_file_md5(&handle, size)?;
        let source = UploadSource::from_file(handle, size);
        self.put(dest_dir, dest_name, &etag, &source).await
    }

    /// `About`: account quota.
    pub async fn about(&self) -> Result<crate::api::user_info::UserInfoData> {
        crate::api::user_info::user_info(&self.gateway).await
    }

    async fn path_to_id_or_root(&self, path: &str) -> Result<i64> {
        if path.is_empty() || path == "/" {
            return Ok(self.root_id);
        }
        self.resolver.path_to_file_id(path).await
    }
}

fn split_parent(path: &str) -> (&str, &str) {
    match path.trim_end_matches('/').rsplit_once('/') {
        Some((parent, name)) => (parent, name),
        None => ("", path),
    }
}

fn compute_file_md5(file: &std::fs::File, size: u64) -> Result<String> {
    use crate::util::digest::StreamingMd5;
    use crate::util::fs::read_at;
    const CHUNK: u64 = 16 << 20;
    let mut digest = StreamingMd5::new();
    let mut offset = 0u64;
    while offset < size {
        let len = CHUNK.min(size - offset);
        let bytes = read_at(file, offset, len)?;
        digest.update(&bytes);
        offset += len;
    }
    Ok(digest.finalize_hex())
}

#[cfg(test)]
mod tests {
    use super::split_parent;

    #[test]
    fn splits_nested_path_into_parent_and_name() {
        assert_eq!(split_parent("/a/b/c.txt"), ("/a/b", "c.txt"));
    }

    #[test]
    fn top_level_path_has_empty_parent() {
        assert_eq!(split_parent("/c.txt"), ("", "c.txt"));
    }

    #[test]
    fn trailing_slash_is_ignored() {
        assert_eq!(split_parent("/a/b/"), ("/a", "b"));
    }

    #[test]
    fn bare_name_with_no_separator_has_empty_parent() {
        assert_eq!(split_parent("c.txt"), ("", "c.txt"));
    }
}
