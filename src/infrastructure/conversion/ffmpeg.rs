//! FFmpeg transcoder adapter
//!
//! The engine is the `ffmpeg` executable. Each loaded engine owns a private
//! scratch directory; job files live there under flat names and FFmpeg runs
//! with that directory as its working directory.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::fs;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, trace};

use crate::application::ports::{EngineError, RatioCallback, Transcoder, TranscoderLoader};

/// Encoder every conversion relies on
const REQUIRED_ENCODER: &str = "libmp3lame";

/// Loads and verifies an FFmpeg executable
pub struct FfmpegLoader {
    binary: PathBuf,
}

impl FfmpegLoader {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    async fn query(&self, args: &[&str]) -> Result<String, EngineError> {
        let output = Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    EngineError::NotFound(self.binary.display().to_string())
                } else {
                    EngineError::LoadFailed(e.to_string())
                }
            })?;

        if !output.status.success() {
            return Err(EngineError::LoadFailed(format!(
                "{} {} exited with {}",
                self.binary.display(),
                args.join(" "),
                output.status
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Default for FfmpegLoader {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

#[async_trait]
impl TranscoderLoader for FfmpegLoader {
    async fn load(&self) -> Result<Arc<dyn Transcoder>, EngineError> {
        let version = self.query(&["-hide_banner", "-version"]).await?;
        let version = version.lines().next().unwrap_or("ffmpeg").trim().to_string();

        let encoders = self.query(&["-hide_banner", "-encoders"]).await?;
        if !has_encoder(&encoders, REQUIRED_ENCODER) {
            return Err(EngineError::MissingEncoder(REQUIRED_ENCODER.to_string()));
        }

        let workspace = tempfile::Builder::new()
            .prefix("phrase-recorder-")
            .tempdir()
            .map_err(|e| EngineError::LoadFailed(format!("scratch directory: {}", e)))?;
        debug!(workspace = %workspace.path().display(), "transcoder workspace created");

        Ok(Arc::new(FfmpegTranscoder {
            binary: self.binary.clone(),
            version,
            workspace,
        }))
    }
}

/// A verified FFmpeg executable with its scratch directory
pub struct FfmpegTranscoder {
    binary: PathBuf,
    version: String,
    workspace: TempDir,
}

impl FfmpegTranscoder {
    pub fn workspace(&self) -> &Path {
        self.workspace.path()
    }

    fn resolve(&self, name: &str) -> Result<PathBuf, EngineError> {
        validate_file_name(name)?;
        Ok(self.workspace.path().join(name))
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    fn describe(&self) -> String {
        self.version.clone()
    }

    async fn write_file(&self, name: &str, data: &[u8]) -> Result<(), EngineError> {
        let path = self.resolve(name)?;
        fs::write(&path, data)
            .await
            .map_err(|e| EngineError::Io(format!("write {}: {}", name, e)))
    }

    async fn run(
        &self,
        args: &[String],
        media_duration: Option<StdDuration>,
        on_ratio: Option<RatioCallback>,
    ) -> Result<(), EngineError> {
        let mut child = Command::new(&self.binary)
            .current_dir(self.workspace.path())
            .args(["-hide_banner", "-nostdin", "-y", "-progress", "pipe:1", "-nostats"])
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| EngineError::RunFailed(e.to_string()))?;

        // Drain stderr concurrently so a chatty encoder cannot block on a full pipe
        let stderr_task = child.stderr.take().map(|mut stderr| {
            tokio::spawn(async move {
                let mut text = String::new();
                let _ = stderr.read_to_string(&mut text).await;
                text
            })
        });

        if let Some(stdout) = child.stdout.take() {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                trace!(line = %line, "ffmpeg progress");
                let (Some(elapsed), Some(total), Some(cb)) =
                    (parse_progress_time(&line), media_duration, on_ratio.as_ref())
                else {
                    continue;
                };
                if !total.is_zero() {
                    cb((elapsed / total.as_secs_f64()).clamp(0.0, 1.0));
                }
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| EngineError::RunFailed(e.to_string()))?;
        let stderr = match stderr_task {
            Some(task) => task.await.unwrap_or_default(),
            None => String::new(),
        };

        if !status.success() {
            let reason = last_meaningful_line(&stderr)
                .map(str::to_string)
                .unwrap_or_else(|| format!("ffmpeg exited with {}", status));
            return Err(EngineError::RunFailed(reason));
        }
        Ok(())
    }

    async fn read_file(&self, name: &str) -> Result<Vec<u8>, EngineError> {
        let path = self.resolve(name)?;
        fs::read(&path)
            .await
            .map_err(|e| EngineError::Io(format!("read {}: {}", name, e)))
    }

    async fn remove_file(&self, name: &str) -> Result<(), EngineError> {
        let path = self.resolve(name)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(EngineError::Io(format!("remove {}: {}", name, e))),
        }
    }
}

/// Workspace names must be a single plain path component
fn validate_file_name(name: &str) -> Result<(), EngineError> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0');
    if invalid {
        return Err(EngineError::InvalidFileName(name.to_string()));
    }
    Ok(())
}

/// Whether `-encoders` output lists `encoder`
fn has_encoder(listing: &str, encoder: &str) -> bool {
    listing
        .lines()
        .any(|line| line.split_whitespace().nth(1) == Some(encoder))
}

/// Media time in seconds from a `-progress` key=value line
fn parse_progress_time(line: &str) -> Option<f64> {
    let (key, value) = line.trim().split_once('=')?;
    match key {
        // Both keys carry microseconds
        "out_time_us" | "out_time_ms" => value
            .parse::<i64>()
            .ok()
            .filter(|v| *v >= 0)
            .map(|v| v as f64 / 1_000_000.0),
        _ => None,
    }
}

fn last_meaningful_line(text: &str) -> Option<&str> {
    text.lines().rev().map(str::trim).find(|l| !l.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_progress_keys() {
        assert_eq!(parse_progress_time("out_time_us=1500000"), Some(1.5));
        assert_eq!(parse_progress_time("out_time_ms=250000"), Some(0.25));
        assert_eq!(parse_progress_time("out_time_us=N/A"), None);
        assert_eq!(parse_progress_time("out_time_us=-5"), None);
        assert_eq!(parse_progress_time("progress=continue"), None);
        assert_eq!(parse_progress_time("garbage"), None);
    }

    #[test]
    fn detects_encoder_listing() {
        let listing = "Encoders:\n ------\n A....D libmp3lame           libmp3lame MP3\n A....D flac                 FLAC";
        assert!(has_encoder(listing, "libmp3lame"));
        assert!(has_encoder(listing, "flac"));
        assert!(!has_encoder(listing, "libopus"));
    }

    #[test]
    fn rejects_paths_as_file_names() {
        assert!(validate_file_name("input-1.flac").is_ok());
        for bad in ["", "..", "../x", "a/b", "a\\b"] {
            assert!(matches!(
                validate_file_name(bad),
                Err(EngineError::InvalidFileName(_))
            ));
        }
    }

    #[test]
    fn last_line_skips_blank_tail() {
        assert_eq!(
            last_meaningful_line("first\nUnknown encoder 'x'\n\n"),
            Some("Unknown encoder 'x'")
        );
        assert_eq!(last_meaningful_line("\n \n"), None);
    }

    #[tokio::test]
    async fn missing_binary_is_not_found() {
        let loader = FfmpegLoader::new("/nonexistent/phrase-recorder-ffmpeg");
        assert!(matches!(
            loader.load().await,
            Err(EngineError::NotFound(_))
        ));
    }
}
