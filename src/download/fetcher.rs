//! Streaming downloads of the raster datasets into the data directory.

use crate::download::error::DownloadError;
use crate::types::dataset::{Dataset, RemoteFileKind};
use futures_util::TryStreamExt;
use log::{info, warn};
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::io::AsyncWriteExt;
use tokio::{fs, task};

/// Emit a progress log line roughly every this many bytes.
const PROGRESS_LOG_STEP: u64 = 64 * 1024 * 1024;

#[derive(Debug)]
pub struct DatasetFetcher {
    data_dir: PathBuf,
    download_client: Client,
}

impl DatasetFetcher {
    pub fn new(data_dir: &Path) -> DatasetFetcher {
        DatasetFetcher {
            data_dir: data_dir.to_path_buf(),
            download_client: Client::new(),
        }
    }

    /// Makes sure every raster of `dataset` is present in the data
    /// directory, downloading and unpacking whatever is missing. Files
    /// already on disk are never re-downloaded. Returns how many remote
    /// files were actually fetched.
    pub async fn ensure_dataset(&self, dataset: Dataset) -> Result<usize, DownloadError> {
        fs::create_dir_all(&self.data_dir).await?;
        let mut fetched = 0;
        for remote in dataset.remote_files() {
            let marker = self.data_dir.join(&remote.satisfied_by);
            if fs::metadata(&marker).await.is_ok() {
                info!(
                    "Cache hit for {} ({} present)",
                    remote.file_name, remote.satisfied_by
                );
                continue;
            }
            warn!(
                "Cache miss for {} of the {} dataset. Downloading.",
                remote.file_name, dataset
            );
            let dest = self.data_dir.join(&remote.file_name);
            self.download_file(&remote.url, &dest).await?;
            if remote.kind == RemoteFileKind::ZipArchive {
                self.unpack_archive(dest).await?;
            }
            fetched += 1;
        }
        info!(
            "Dataset {} ready in {}",
            dataset.title(),
            self.data_dir.display()
        );
        Ok(fetched)
    }

    /// Downloads every entry of a newline-delimited URL list into the data
    /// directory, skipping blank lines, `#` comments and files that already
    /// exist. Returns the paths of the files that were fetched.
    pub async fn download_url_list(&self, list_path: &Path) -> Result<Vec<PathBuf>, DownloadError> {
        let text = fs::read_to_string(list_path)
            .await
            .map_err(|e| DownloadError::UrlListRead(list_path.to_path_buf(), e))?;
        fs::create_dir_all(&self.data_dir).await?;

        let mut saved = Vec::new();
        for line in text.lines() {
            let url = line.trim();
            if url.is_empty() || url.starts_with('#') {
                continue;
            }
            let file_name = url
                .rsplit('/')
                .next()
                .filter(|name| !name.is_empty())
                .ok_or_else(|| DownloadError::BadUrl(url.to_string()))?;
            let dest = self.data_dir.join(file_name);
            if fs::metadata(&dest).await.is_ok() {
                info!("Skipping {file_name} (already present)");
                continue;
            }
            self.download_file(url, &dest).await?;
            saved.push(dest);
        }
        Ok(saved)
    }

    /// Streams a single URL to `dest`, writing through a `.part` file so a
    /// failed transfer never leaves a truncated raster behind.
    pub(crate) async fn download_file(&self, url: &str, dest: &Path) -> Result<(), DownloadError> {
        let response = self
            .download_client
            .get(url)
            .send()
            .await
            .map_err(|e| DownloadError::NetworkRequest(url.to_string(), e))?;

        let response = match response.error_for_status() {
            Ok(resp) => resp,
            Err(e) => {
                warn!("HTTP error for {url}: {e:?}");
                return Err(if let Some(status) = e.status() {
                    DownloadError::HttpStatus {
                        url: url.to_string(),
                        status,
                        source: e,
                    }
                } else {
                    DownloadError::NetworkRequest(url.to_string(), e)
                });
            }
        };

        let total_bytes = response.content_length();
        let file_name = dest
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| url.to_string());
        if let Some(total) = total_bytes {
            info!(
                "Downloading {} ({:.1} MB) from {}",
                file_name,
                total as f64 / 1e6,
                url
            );
        } else {
            info!("Downloading {file_name} (unknown size) from {url}");
        }

        let part_path = dest.with_file_name(format!("{file_name}.part"));
        let mut file = fs::File::create(&part_path).await?;
        let mut stream = response.bytes_stream();
        let mut downloaded: u64 = 0;
        let mut next_log = PROGRESS_LOG_STEP;
        let started = Instant::now();

        while let Some(chunk) = stream
            .try_next()
            .await
            .map_err(|e| DownloadError::NetworkRequest(url.to_string(), e))?
        {
            file.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;
            if downloaded >= next_log {
                next_log += PROGRESS_LOG_STEP;
                let mb = downloaded as f64 / 1e6;
                let speed = mb / started.elapsed().as_secs_f64().max(f64::EPSILON);
                match total_bytes {
                    Some(total) if total > 0 => info!(
                        "Progress for {}: {:.1} % of {:.1} MB [{:.1} MB/s]",
                        file_name,
                        downloaded as f64 / total as f64 * 100.0,
                        total as f64 / 1e6,
                        speed
                    ),
                    _ => info!("Progress for {file_name}: {mb:.1} MB [{speed:.1} MB/s]"),
                }
            }
        }
        file.flush().await?;
        drop(file);
        fs::rename(&part_path, dest).await?;

        let elapsed = started.elapsed();
        info!(
            "Done downloading {} ({:.1} MB in {:.1}s, {:.1} MB/s)",
            file_name,
            downloaded as f64 / 1e6,
            elapsed.as_secs_f64(),
            downloaded as f64 / 1e6 / elapsed.as_secs_f64().max(f64::EPSILON)
        );
        Ok(())
    }

    /// Unpacks a zip archive into the data directory and removes the
    /// archive, mirroring the WorldClim distribution layout.
    pub(crate) async fn unpack_archive(&self, archive_path: PathBuf) -> Result<(), DownloadError> {
        info!(
            "Unpacking {} into {}",
            archive_path.display(),
            self.data_dir.display()
        );
        let dir = self.data_dir.clone();
        let path_for_task = archive_path.clone();
        task::spawn_blocking(move || -> Result<(), DownloadError> {
            let file = std::fs::File::open(&path_for_task)?;
            let mut archive = zip::ZipArchive::new(file)
                .map_err(|e| DownloadError::ArchiveExtract(path_for_task.clone(), e))?;
            archive
                .extract(&dir)
                .map_err(|e| DownloadError::ArchiveExtract(path_for_task.clone(), e))?;
            Ok(())
        })
        .await??;

        fs::remove_file(&archive_path).await?;
        info!("Removed {}", archive_path.display());
        Ok(())
    }
}
