//! FFmpeg command builder and runner.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};

/// Output target that streams encoded data to stdout.
pub const PIPE_STDOUT: &str = "pipe:1";

/// Log level passed to every ffmpeg invocation.
const LOG_LEVEL: &str = "error";

/// Builder for FFmpeg commands that stream their output to stdout.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    /// Input file path
    input: PathBuf,
    /// Output arguments (after -i)
    output_args: Vec<String>,
}

impl FfmpegCommand {
    /// Create a new FFmpeg command writing to stdout.
    pub fn to_pipe(input: impl AsRef<Path>) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output_args: Vec::new(),
        }
    }

    /// Add output arguments (after -i).
    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    /// Set video filter.
    pub fn video_filter(self, filter: impl Into<String>) -> Self {
        self.output_arg("-vf").output_arg(filter)
    }

    /// Set video codec.
    pub fn video_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:v").output_arg(codec)
    }

    /// Set output container format.
    pub fn format(self, format: impl Into<String>) -> Self {
        self.output_arg("-f").output_arg(format)
    }

    /// Extract single frame.
    pub fn single_frame(self) -> Self {
        self.output_arg("-frames:v").output_arg("1")
    }

    /// Select exactly the frame at `index` (0-based, decode order).
    pub fn select_frame(self, index: u64) -> Self {
        self.video_filter(format!("select=eq(n\\,{})", index))
            .single_frame()
    }

    /// Build the command arguments.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = vec![
            "-v".to_string(),
            LOG_LEVEL.to_string(),
            // Never wait on stdin
            "-nostdin".to_string(),
            "-i".to_string(),
            self.input.to_string_lossy().to_string(),
        ];

        args.extend(self.output_args.clone());
        args.push(PIPE_STDOUT.to_string());

        args
    }
}

/// Runner for FFmpeg commands.
#[derive(Debug, Default, Clone)]
pub struct FfmpegRunner {
    /// Timeout in seconds
    timeout_secs: Option<u64>,
}

impl FfmpegRunner {
    /// Kill invocations that run longer than `secs`.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    pub fn timeout_secs(&self) -> Option<u64> {
        self.timeout_secs
    }

    /// Run an FFmpeg command and collect everything it writes to stdout.
    pub async fn run_capture(&self, cmd: &FfmpegCommand) -> MediaResult<Vec<u8>> {
        check_ffmpeg()?;

        let args = cmd.build_args();
        debug!("Running FFmpeg: ffmpeg {}", args.join(" "));

        let child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let output = match self.timeout_secs {
            Some(secs) => {
                match tokio::time::timeout(Duration::from_secs(secs), child.wait_with_output())
                    .await
                {
                    Ok(result) => result?,
                    Err(_) => {
                        // kill_on_drop reaps the process
                        warn!("FFmpeg timed out after {} seconds, killing process", secs);
                        return Err(MediaError::Timeout(secs));
                    }
                }
            }
            None => child.wait_with_output().await?,
        };

        if output.status.success() {
            Ok(output.stdout)
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            Err(MediaError::ffmpeg_failed(
                "FFmpeg exited with non-zero status",
                (!stderr.is_empty()).then_some(stderr),
                output.status.code(),
            ))
        }
    }
}

/// Check if FFmpeg is available.
pub fn check_ffmpeg() -> MediaResult<PathBuf> {
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)
}

/// Check if FFprobe is available.
pub fn check_ffprobe() -> MediaResult<PathBuf> {
    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_builder() {
        let args = FfmpegCommand::to_pipe("input.webm")
            .video_codec("png")
            .single_frame()
            .build_args();

        assert_eq!(args[..3], ["-v", "error", "-nostdin"]);
        assert!(args.contains(&"-c:v".to_string()));
        assert!(args.contains(&"png".to_string()));
        assert_eq!(args.last().map(String::as_str), Some(PIPE_STDOUT));
    }

    #[test]
    fn test_select_frame_escapes_comma() {
        let args = FfmpegCommand::to_pipe("input.webm").select_frame(95).build_args();

        let vf = args.iter().position(|a| a == "-vf").unwrap();
        assert_eq!(args[vf + 1], "select=eq(n\\,95)");
        assert!(args.contains(&"-frames:v".to_string()));
    }

    #[test]
    fn test_input_precedes_output_args() {
        let args = FfmpegCommand::to_pipe("clip.webm")
            .format("image2pipe")
            .build_args();

        let input = args.iter().position(|a| a == "-i").unwrap();
        let format = args.iter().position(|a| a == "-f").unwrap();
        assert!(input < format);
        assert_eq!(args[input + 1], "clip.webm");
    }

    #[test]
    fn test_runner_timeout() {
        assert_eq!(FfmpegRunner::default().timeout_secs(), None);
        assert_eq!(FfmpegRunner::default().with_timeout(30).timeout_secs(), Some(30));
    }
}
