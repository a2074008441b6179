use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::core::platform::Platform;
use crate::core::process;
use crate::models::media::{ArtifactDescriptor, DownloadOptions, MediaInfo, MediaType};
use crate::platforms::traits::{ExtractError, Extractor};

/// Image-board and gallery hosts handled by gallery-dl. The tool owns its
/// own site logic and pagination, so progress here is coarse milestones
/// rather than byte-level percentages.
pub struct GallerySiteExtractor;

impl GallerySiteExtractor {
    pub fn new() -> Self {
        Self
    }

    async fn find_gallery_dl() -> Result<String, ExtractError> {
        for candidate in ["gallery-dl", "gallery_dl"] {
            let probe = process::command(candidate)
                .arg("--version")
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .await;
            if matches!(probe, Ok(s) if s.success()) {
                return Ok(candidate.to_string());
            }
        }
        Err(ExtractError::Transient(
            "gallery-dl não encontrado no PATH".into(),
        ))
    }

    /// gallery-dl prints the path of every file it writes. Lines that name
    /// an existing file under the destination are the produced artifacts.
    fn parse_written_path(line: &str, dest_dir: &Path) -> Option<PathBuf> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return None;
        }
        let path = PathBuf::from(trimmed.trim_start_matches("# "));
        if path.starts_with(dest_dir) {
            Some(path)
        } else {
            None
        }
    }
}

impl Default for GallerySiteExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Extractor for GallerySiteExtractor {
    fn name(&self) -> &'static str {
        "gallery_site"
    }

    async fn fetch_info(&self, url: &str) -> Result<MediaInfo, ExtractError> {
        let gallery_dl = Self::find_gallery_dl().await?;

        let output = process::command(&gallery_dl)
            .arg("--dump-json")
            .arg("--quiet")
            .arg(url)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExtractError::from_signature(format!(
                "gallery-dl falhou ao inspecionar {}: {}",
                url,
                stderr.trim()
            )));
        }

        let json: serde_json::Value = serde_json::from_slice(&output.stdout)
            .map_err(|e| ExtractError::Transient(format!("saída inválida do gallery-dl: {}", e)))?;

        // --dump-json emits an array of [code, metadata] entries, one per file
        let entries = json.as_array().cloned().unwrap_or_default();
        let first_meta = entries
            .iter()
            .filter_map(|e| e.as_array())
            .filter_map(|e| e.last())
            .find(|m| m.is_object())
            .cloned()
            .unwrap_or_default();

        let count = entries
            .iter()
            .filter_map(|e| e.as_array())
            .filter(|e| e.first().and_then(|c| c.as_i64()) == Some(3))
            .count()
            .max(1) as u32;

        Ok(MediaInfo {
            title: first_meta
                .get("title")
                .or_else(|| first_meta.get("gallery_id"))
                .and_then(|v| v.as_str())
                .unwrap_or("Gallery")
                .to_string(),
            uploader: first_meta
                .get("artist")
                .or_else(|| first_meta.get("uploader"))
                .or_else(|| first_meta.get("category"))
                .and_then(|v| v.as_str())
                .unwrap_or("unknown")
                .to_string(),
            platform: Platform::GallerySite,
            duration_seconds: None,
            view_count: None,
            upload_date: first_meta
                .get("date")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string()),
            thumbnail_url: None,
            media_type: if count > 1 {
                MediaType::Gallery
            } else {
                MediaType::Image
            },
            media_count: count,
        })
    }

    async fn fetch_media(
        &self,
        url: &str,
        _opts: &DownloadOptions,
        dest_dir: &Path,
        progress: mpsc::Sender<f64>,
    ) -> Result<ArtifactDescriptor, ExtractError> {
        let gallery_dl = Self::find_gallery_dl().await?;
        tokio::fs::create_dir_all(dest_dir).await?;

        let _ = progress.try_send(10.0);

        // -D pins the exact output directory; the default --dest would nest
        // files under <dest>/<category>/<id>/ and strand them outside the
        // flat per-uploader layout
        let mut child = process::command(&gallery_dl)
            .arg("-D")
            .arg(dest_dir)
            .arg(url)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let _ = progress.try_send(30.0);

        let stdout = child.stdout.take();
        let mut written: Vec<PathBuf> = Vec::new();
        if let Some(stdout) = stdout {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if let Some(path) = Self::parse_written_path(&line, dest_dir) {
                    written.push(path);
                }
            }
        }

        let _ = progress.try_send(80.0);

        let mut stderr_buf = String::new();
        if let Some(mut stderr) = child.stderr.take() {
            use tokio::io::AsyncReadExt;
            let _ = stderr.read_to_string(&mut stderr_buf).await;
        }

        let status = child.wait().await?;
        if !status.success() {
            return Err(ExtractError::from_signature(format!(
                "gallery-dl falhou para {}: {}",
                url,
                stderr_buf.trim()
            )));
        }

        let mut total_bytes = 0u64;
        let mut first_existing: Option<PathBuf> = None;
        for path in &written {
            if let Ok(meta) = tokio::fs::metadata(path).await {
                total_bytes += meta.len();
                if first_existing.is_none() {
                    first_existing = Some(path.clone());
                }
            }
        }

        let path = first_existing.ok_or_else(|| {
            ExtractError::Transient(format!("gallery-dl não produziu arquivos para {}", url))
        })?;

        let _ = progress.try_send(100.0);
        Ok(ArtifactDescriptor {
            path,
            size_bytes: total_bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stdout_lines_inside_dest_are_artifacts() {
        let dest = Path::new("/tmp/dl/Galleries/artist");
        assert_eq!(
            GallerySiteExtractor::parse_written_path("/tmp/dl/Galleries/artist/001.jpg", dest),
            Some(PathBuf::from("/tmp/dl/Galleries/artist/001.jpg"))
        );
        // skipped files are prefixed with "# "
        assert_eq!(
            GallerySiteExtractor::parse_written_path("# /tmp/dl/Galleries/artist/002.jpg", dest),
            Some(PathBuf::from("/tmp/dl/Galleries/artist/002.jpg"))
        );
    }

    #[test]
    fn stdout_lines_outside_dest_are_ignored() {
        let dest = Path::new("/tmp/dl/Galleries/artist");
        assert_eq!(
            GallerySiteExtractor::parse_written_path("/etc/passwd", dest),
            None
        );
        assert_eq!(GallerySiteExtractor::parse_written_path("   ", dest), None);
    }
}
