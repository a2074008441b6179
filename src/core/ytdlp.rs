use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::anyhow;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::core::process;
use crate::models::media::ArtifactDescriptor;

pub async fn find_ytdlp() -> anyhow::Result<PathBuf> {
    let bin_name = if cfg!(target_os = "windows") {
        "yt-dlp.exe"
    } else {
        "yt-dlp"
    };

    if let Ok(status) = process::command(bin_name)
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
    {
        if status.success() {
            return Ok(PathBuf::from(bin_name));
        }
    }

    Err(anyhow!(
        "yt-dlp não encontrado no PATH — instale-o para baixar vídeos"
    ))
}

/// Metadata-only probe: `--dump-json` without downloading anything.
pub async fn dump_info(ytdlp: &Path, url: &str) -> anyhow::Result<serde_json::Value> {
    let output = process::command(ytdlp)
        .args(["--dump-json", "--no-warnings", "--no-playlist", url])
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| anyhow!("Falha ao executar yt-dlp: {}", e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(anyhow!("yt-dlp falhou: {}", stderr.trim()));
    }

    serde_json::from_slice(&output.stdout)
        .map_err(|e| anyhow!("yt-dlp retornou JSON inválido: {}", e))
}

/// Downloads one media item into `dest_dir`, streaming percentage progress
/// parsed from yt-dlp's own progress template. The final artifact path
/// comes from `--print after_move:filepath` — yt-dlp tells us exactly
/// which file it produced, so nothing here guesses by scanning directories.
pub async fn download_media(
    ytdlp: &Path,
    url: &str,
    dest_dir: &Path,
    quality_height: Option<u32>,
    audio_only: bool,
    output_format: &str,
    progress: mpsc::Sender<f64>,
) -> anyhow::Result<ArtifactDescriptor> {
    let format_selector = if audio_only {
        "ba/b".to_string()
    } else {
        match quality_height {
            Some(h) if h > 0 => format!("bv*[height<={}]+ba/b[height<={}]/bv*+ba/b", h, h),
            _ => "bv*+ba/b".to_string(),
        }
    };

    let output_template = dest_dir
        .join("%(title).200s.%(ext)s")
        .to_string_lossy()
        .to_string();

    let mut args = vec!["-f".to_string(), format_selector];

    if audio_only {
        args.push("-x".to_string());
        args.push("--audio-format".to_string());
        args.push("mp3".to_string());
    } else {
        args.push("--merge-output-format".to_string());
        args.push(output_format.to_string());
    }

    args.extend([
        "--no-playlist".to_string(),
        "--quiet".to_string(),
        "--progress".to_string(),
        "--newline".to_string(),
        "--progress-template".to_string(),
        "download:%(progress._percent_str)s".to_string(),
        "--print".to_string(),
        "after_move:filepath".to_string(),
        "-o".to_string(),
        output_template,
        url.to_string(),
    ]);

    let mut child = process::command(ytdlp)
        .args(&args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| anyhow!("Falha ao iniciar yt-dlp: {}", e))?;

    let stdout = child.stdout.take().ok_or_else(|| anyhow!("Sem stdout"))?;
    let stderr = child.stderr.take().ok_or_else(|| anyhow!("Sem stderr"))?;

    let stderr_reader = tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        let mut captured = String::new();
        while let Ok(Some(line)) = lines.next_line().await {
            if !captured.is_empty() {
                captured.push('\n');
            }
            captured.push_str(&line);
        }
        captured
    });

    let progress_tx = progress.clone();
    let line_reader = tokio::spawn(async move {
        let mut lines = BufReader::new(stdout).lines();
        let mut reported_path: Option<PathBuf> = None;
        while let Ok(Some(line)) = lines.next_line().await {
            if let Some(pct) = parse_progress_line(&line) {
                let _ = progress_tx.send(pct).await;
            } else if !line.trim().is_empty() {
                reported_path = Some(PathBuf::from(line.trim()));
            }
        }
        reported_path
    });

    let status = child
        .wait()
        .await
        .map_err(|e| anyhow!("yt-dlp processo falhou: {}", e))?;

    let reported_path = line_reader.await.unwrap_or(None);
    let stderr_text = stderr_reader.await.unwrap_or_default();

    if !status.success() {
        return Err(anyhow!("yt-dlp falhou: {}", stderr_text.trim()));
    }

    let path = reported_path.ok_or_else(|| anyhow!("yt-dlp não informou o arquivo final"))?;
    let meta = tokio::fs::metadata(&path).await?;
    let _ = progress.send(100.0).await;

    Ok(ArtifactDescriptor {
        path,
        size_bytes: meta.len(),
    })
}

fn parse_progress_line(line: &str) -> Option<f64> {
    let line = line.trim();
    let pct_str = line.strip_prefix("download:")?.trim().trim_end_matches('%');
    pct_str.trim().parse::<f64>().ok()
}

/// "1080p" / "720" → height; "best" and friends mean no cap.
pub fn quality_height(quality: &str) -> Option<u32> {
    let s = quality.trim().to_lowercase();
    if s.is_empty() || s == "best" || s == "highest" {
        return None;
    }
    s.trim_end_matches('p').parse::<u32>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_progress_template_lines() {
        assert_eq!(parse_progress_line("download:  42.5%"), Some(42.5));
        assert_eq!(parse_progress_line("download: 100.0%"), Some(100.0));
    }

    #[test]
    fn ignores_non_progress_lines() {
        assert_eq!(parse_progress_line("/downloads/Channel/video.mp4"), None);
        assert_eq!(parse_progress_line(""), None);
    }

    #[test]
    fn quality_height_parsing() {
        assert_eq!(quality_height("1080p"), Some(1080));
        assert_eq!(quality_height("720"), Some(720));
        assert_eq!(quality_height("best"), None);
        assert_eq!(quality_height("garbage"), None);
    }
}
