//! Parallel ranged downloader (spec §4.K): concurrent `Range` GETs into a
//! sparse temp file, per-chunk retry and integrity, exposed as a
//! `Drop`-cleaned temp file handle.

use std::fs::File;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tokio::sync::Semaphore;

use crate::api::download_info::download_info;
use crate::constant::{
    CHUNK_RETRY_ATTEMPTS, CHUNK_TIMEOUT, DOWNLOAD_CHUNK_SIZE, MAX_DOWNLOAD_WORKERS,
    PARALLEL_DOWNLOAD_MIN_SIZE,
};
use crate::error::{Pan123Error, Result};
use crate::gateway::Gateway;
use crate::util::fs::write_at;
use crate::vfs::ProgressSink;

/// A downloaded file materialized into a temp file; removed on drop.
pub struct DownloadedFile {
    path: std::path::PathBuf,
    file: Option<File>,
}

impl DownloadedFile {
    pub fn file(&self) -> &File {
        self.file.as_ref().expect("file present until drop")
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl Drop for DownloadedFile {
    fn drop(&mut self) {
        self.file.take();
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Download `file_id` (size `size`) into a sparse temp file. Uses the
/// concurrent ranged path when `size >= PARALLEL_DOWNLOAD_MIN_SIZE`;
/// otherwise a single whole-file GET.
pub async fn open(
    gateway: &Arc<Gateway>,
    http: &Client,
    progress: &Arc<dyn ProgressSink>,
    file_id: i64,
    size: u64,
) -> Result<DownloadedFile> {
    let info = download_info(gateway, file_id).await?;
    let tmp_path = std::env::temp_dir().join(format!("pan123-core-dl-{file_id}-{}", uniq_suffix()));
    let file = File::create(&tmp_path).map_err(Pan123Error::Io)?;
    file.set_len(size).map_err(Pan123Error::Io)?;

    let result = if size >= PARALLEL_DOWNLOAD_MIN_SIZE {
        download_parallel(http, progress, &info.download_url, &file, size).await
    } else {
        download_whole(http, &info.download_url, &file, size).await
    };

    if let Err(e) = result {
        drop(file);
        let _ = std::fs::remove_file(&tmp_path);
        return Err(e);
    }

    Ok(DownloadedFile {
        path: tmp_path,
        file: Some(file),
    })
}

fn uniq_suffix() -> u64 {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    COUNTER.fetch_add(1, Ordering::Relaxed)
}

async fn download_whole(http: &Client, url: &str, file: &File, size: u64) -> Result<()> {
    let bytes = fetch_range(http, url, 0, size.saturating_sub(1)).await?;
    if bytes.len() as u64 != size {
        return Err(Pan123Error::Integrity(format!(
            "whole-file download got {} bytes, expected {size}",
            bytes.len()
        )));
    }
    write_at(file, 0, &bytes)
}

async fn download_parallel(
    http: &Client,
    progress: &Arc<dyn ProgressSink>,
    url: &str,
    file: &File,
    size: u64,
) -> Result<()> {
    let chunk_count = size.div_ceil(DOWNLOAD_CHUNK_SIZE);
    let workers = (chunk_count as usize).min(MAX_DOWNLOAD_WORKERS).max(1);
    let semaphore = Arc::new(Semaphore::new(workers));
    let overall_deadline = Duration::from_secs(2 * 60 * 60)
        .min(Duration::from_secs(15 * 60) * chunk_count as u32);

    let mut tasks = Vec::with_capacity(chunk_count as usize);
    for chunk_index in 0..chunk_count {
        let offset = chunk_index * DOWNLOAD_CHUNK_SIZE;
        let len = DOWNLOAD_CHUNK_SIZE.min(size - offset);
        let permit = Arc::clone(&semaphore);
        let http = http.clone();
        let url = url.to_string();
        let handle = file.try_clone().map_err(Pan123Error::Io)?;
        let progress = Arc::clone(progress);

        tasks.push(tokio::spawn(async move {
            let _permit = permit.acquire_owned().await.expect("semaphore not closed");
            download_chunk_with_retry(&http, &url, &handle, offset, len).await?;
            progress.on_chunk_done(chunk_index as usize);
            Ok::<_, Pan123Error>(())
        }));
    }

    let joined = tokio::time::timeout(overall_deadline, async {
        let mut first_error = None;
        for task in tasks {
            match task.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    first_error.get_or_insert(e);
                }
                Err(e) => {
                    first_error.get_or_insert(Pan123Error::Internal(e.to_string()));
                }
            }
        }
        first_error
    })
    .await
    .map_err(|_| Pan123Error::Internal("parallel download exceeded overall deadline".into()))?;

    match joined {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

async fn download_chunk_with_retry(
    http: &Client,
    url: &str,
    file: &File,
    offset: u64,
    len: u64,
) -> Result<()> {
    let mut last_err = None;
    for attempt in 1..=CHUNK_RETRY_ATTEMPTS {
        let result = tokio::time::timeout(
            CHUNK_TIMEOUT,
            fetch_range(http, url, offset, offset + len - 1),
        )
        .await;

        match result {
            Ok(Ok(bytes)) if bytes.len() as u64 == len => {
                write_at(file, offset, &bytes)?;
                return Ok(());
            }
            Ok(Ok(bytes)) => {
                last_err = Some(Pan123Error::Integrity(format!(
                    "chunk at {offset} got {} bytes, expected {len}",
                    bytes.len()
                )));
            }
            Ok(Err(e)) => last_err = Some(e),
            Err(_) => last_err = Some(Pan123Error::Internal(format!("chunk at {offset} timed out"))),
        }

        if attempt < CHUNK_RETRY_ATTEMPTS {
            tokio::time::sleep(Duration::from_millis(500 * attempt as u64)).await;
        }
    }
    Err(last_err.unwrap_or_else(|| Pan123Error::Internal("chunk download failed".into())))
}

async fn fetch_range(http: &Client, url: &str, start: u64, end: u64) -> Result<bytes::Bytes> {
    let resp = http
        .get(url)
        .header("Range", format!("bytes={start}-{end}"))
        .send()
        .await
        .map_err(Pan123Error::Transport)?;
    if !resp.status().is_success() {
        return Err(Pan123Error::HttpStatus(resp.status().as_u16()));
    }
    resp.bytes().await.map_err(Pan123Error::Transport)
}
