//! FFprobe frame counting.

use serde::Deserialize;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use crate::command::check_ffprobe;
use crate::error::{MediaError, MediaResult};

/// FFprobe JSON output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    nb_frames: Option<String>,
    nb_read_frames: Option<String>,
}

/// Count the decodable frames of the first video stream.
///
/// Uses `-count_frames`, which decodes the whole stream. Browser-recorded
/// WebM rarely carries a frame count in its header, so this is the only
/// reliable source for short uploads.
pub async fn count_frames(path: impl AsRef<Path>) -> MediaResult<u64> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }

    check_ffprobe()?;

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-count_frames",
            "-show_entries",
            "stream=nb_frames,nb_read_frames",
            "-print_format",
            "json",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::ffprobe_failed(
            "FFprobe failed",
            Some(String::from_utf8_lossy(&output.stderr).to_string()),
        ));
    }

    parse_frame_count(&output.stdout)
}

/// Extract the frame count from ffprobe JSON output.
///
/// Prefers the decoded count over the container's declared count.
fn parse_frame_count(stdout: &[u8]) -> MediaResult<u64> {
    let probe: FfprobeOutput = serde_json::from_slice(stdout)?;

    let stream = probe
        .streams
        .first()
        .ok_or_else(|| MediaError::InvalidVideo("No video stream found".to_string()))?;

    let count = stream
        .nb_read_frames
        .as_deref()
        .and_then(parse_count)
        .or_else(|| stream.nb_frames.as_deref().and_then(parse_count))
        .unwrap_or(0);

    Ok(count)
}

fn parse_count(s: &str) -> Option<u64> {
    s.trim().parse().ok()
}
