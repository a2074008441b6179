use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::anyhow;
use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;

const MAX_RETRIES: u32 = 3;

/// Streams a direct media URL into `output`, reporting percentage progress
/// on the channel. Writes go to a `.part` file first and are renamed into
/// place on success, so a partially-written artifact can never be mistaken
/// for a completed one. Returns the byte size of the final file.
pub async fn download_direct(
    client: &reqwest::Client,
    url: &str,
    output: &Path,
    progress: &mpsc::Sender<f64>,
) -> anyhow::Result<u64> {
    download_direct_with_headers(client, url, output, progress, None).await
}

pub async fn download_direct_with_headers(
    client: &reqwest::Client,
    url: &str,
    output: &Path,
    progress: &mpsc::Sender<f64>,
    headers: Option<reqwest::header::HeaderMap>,
) -> anyhow::Result<u64> {
    let mut last_err = None;

    for attempt in 0..MAX_RETRIES {
        if attempt > 0 {
            tokio::time::sleep(Duration::from_millis(1000 * attempt as u64)).await;
        }

        match download_attempt(client, url, output, progress, headers.clone()).await {
            Ok(bytes) => return Ok(bytes),
            Err(e) => {
                if is_fatal_error(&e) {
                    let _ = tokio::fs::remove_file(part_path_for(output)).await;
                    return Err(e);
                }
                tracing::warn!("[direct] attempt {}/{} failed: {}", attempt + 1, MAX_RETRIES, e);
                last_err = Some(e);
            }
        }
    }

    let _ = tokio::fs::remove_file(part_path_for(output)).await;
    Err(last_err.unwrap_or_else(|| anyhow!("Download falhou após {} tentativas", MAX_RETRIES)))
}

async fn download_attempt(
    client: &reqwest::Client,
    url: &str,
    output: &Path,
    progress: &mpsc::Sender<f64>,
    headers: Option<reqwest::header::HeaderMap>,
) -> anyhow::Result<u64> {
    let mut request = client.get(url);
    if let Some(headers) = headers {
        request = request.headers(headers);
    }
    let response = request.send().await?;

    if !response.status().is_success() {
        return Err(anyhow!("HTTP {} ao baixar {}", response.status(), url));
    }

    let total = response.content_length();
    let part = part_path_for(output);
    let mut file = tokio::fs::File::create(&part).await?;
    let mut stream = response.bytes_stream();
    let mut downloaded: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| anyhow!("Erro no stream de download: {}", e))?;
        file.write_all(&chunk).await?;
        downloaded += chunk.len() as u64;
        if let Some(total) = total {
            if total > 0 {
                let _ = progress.try_send((downloaded as f64 / total as f64) * 100.0);
            }
        }
    }

    file.flush().await?;
    drop(file);
    tokio::fs::rename(&part, output).await?;
    let _ = progress.try_send(100.0);

    Ok(downloaded)
}

fn part_path_for(output: &Path) -> PathBuf {
    let mut part = output.as_os_str().to_owned();
    part.push(".part");
    PathBuf::from(part)
}

fn is_fatal_error(err: &anyhow::Error) -> bool {
    let msg = err.to_string();
    ["HTTP 400", "HTTP 401", "HTTP 403", "HTTP 404", "HTTP 410", "HTTP 451"]
        .iter()
        .any(|code| msg.contains(code))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn part_path_appends_suffix() {
        assert_eq!(
            part_path_for(Path::new("video.mp4")),
            PathBuf::from("video.mp4.part")
        );
    }

    #[test]
    fn part_path_nested() {
        assert_eq!(
            part_path_for(Path::new("downloads/user/post.jpg")),
            PathBuf::from("downloads/user/post.jpg.part")
        );
    }

    #[test]
    fn client_errors_are_fatal() {
        assert!(is_fatal_error(&anyhow!("HTTP 404 Not Found ao baixar x")));
        assert!(is_fatal_error(&anyhow!("HTTP 403 Forbidden ao baixar x")));
    }

    #[test]
    fn server_errors_are_retryable() {
        assert!(!is_fatal_error(&anyhow!("HTTP 500 Internal Server Error")));
        assert!(!is_fatal_error(&anyhow!("Erro no stream de download: reset")));
    }
}
