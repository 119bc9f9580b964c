//! FFmpeg command builder and runner.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};

/// Builder for FFmpeg commands.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    /// Input file path
    input: PathBuf,
    /// Output file path; `None` runs FFmpeg in metadata-only mode
    output: Option<PathBuf>,
    /// Input arguments (before -i)
    input_args: Vec<String>,
    /// Output arguments (after -i)
    output_args: Vec<String>,
    /// Whether to overwrite output
    overwrite: bool,
    /// Log level; FFmpeg's default when unset
    log_level: Option<String>,
}

impl FfmpegCommand {
    /// Create a command that reads `input` and writes `output`.
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output: Some(output.as_ref().to_path_buf()),
            input_args: Vec::new(),
            output_args: Vec::new(),
            overwrite: true,
            log_level: None,
        }
    }

    /// Create a metadata-only command: FFmpeg prints the stream summary to
    /// stderr and exits without writing anything.
    pub fn probe(input: impl AsRef<Path>) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output: None,
            input_args: Vec::new(),
            output_args: Vec::new(),
            overwrite: false,
            log_level: None,
        }
    }

    /// Add input arguments (before -i).
    pub fn input_arg(mut self, arg: impl Into<String>) -> Self {
        self.input_args.push(arg.into());
        self
    }

    /// Add output arguments (after -i).
    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    /// Add multiple output arguments.
    pub fn output_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Copy all streams without re-encoding.
    pub fn codec_copy(self) -> Self {
        self.output_arg("-c").output_arg("copy")
    }

    /// Set output format.
    pub fn format(self, format: impl Into<String>) -> Self {
        self.output_arg("-f").output_arg(format)
    }

    /// HLS segmenting options.
    ///
    /// `list_size` of 0 keeps every segment in the playlist (VOD).
    pub fn hls(self, segment_seconds: u32, list_size: u32) -> Self {
        self.output_args([
            "-start_number".to_string(),
            "0".to_string(),
            "-hls_time".to_string(),
            segment_seconds.to_string(),
            "-hls_list_size".to_string(),
            list_size.to_string(),
        ])
        .format("hls")
    }

    /// Set log level.
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = Some(level.into());
        self
    }

    /// Output path, if any.
    pub fn output_path(&self) -> Option<&Path> {
        self.output.as_deref()
    }

    /// Build the command arguments.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        if self.overwrite {
            args.push("-y".to_string());
        }

        args.push("-hide_banner".to_string());

        if let Some(level) = &self.log_level {
            args.push("-v".to_string());
            args.push(level.clone());
        }

        args.extend(self.input_args.clone());

        args.push("-i".to_string());
        args.push(self.input.to_string_lossy().to_string());

        args.extend(self.output_args.clone());

        if let Some(output) = &self.output {
            args.push(output.to_string_lossy().to_string());
        }

        args
    }
}

/// Everything a finished FFmpeg process left behind.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Exit code; `None` when killed by a signal
    pub exit_code: Option<i32>,
    /// Whether the process exited with status 0
    pub success: bool,
    pub stdout: String,
    /// Diagnostic stream (FFmpeg logs everything here)
    pub stderr: String,
}

/// Runner for FFmpeg commands with a wall-clock deadline.
#[derive(Debug, Clone)]
pub struct FfmpegRunner {
    /// Executable to invoke
    program: PathBuf,
    /// Deadline for process exit
    timeout: Option<Duration>,
}

impl FfmpegRunner {
    /// Create a new runner for the given executable.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            timeout: None,
        }
    }

    /// Set the deadline for process exit.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Executable this runner invokes.
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Run a command and capture both output streams, whatever the exit status.
    ///
    /// stdout and stderr are drained by two spawned tasks while this task waits
    /// for exit, so a process that fills one pipe never blocks on it. On
    /// timeout the process is killed and [`MediaError::Timeout`] is returned.
    pub async fn output(&self, cmd: &FfmpegCommand) -> MediaResult<CommandOutput> {
        let args = cmd.build_args();
        debug!("Running FFmpeg: {} {}", self.program.display(), args.join(" "));

        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    MediaError::FfmpegNotFound(self.program.display().to_string())
                } else {
                    MediaError::Io(e)
                }
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| MediaError::Io(std::io::Error::other("stdout not captured")))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| MediaError::Io(std::io::Error::other("stderr not captured")))?;

        let stdout_task = tokio::spawn(drain(stdout));
        let stderr_task = tokio::spawn(drain(stderr));

        let status = match self.wait_for_exit(&mut child).await {
            Ok(status) => status,
            Err(e) => {
                stdout_task.abort();
                stderr_task.abort();
                return Err(e);
            }
        };

        let stdout = collect(stdout_task, "stdout").await;
        let stderr = collect(stderr_task, "stderr").await;

        Ok(CommandOutput {
            exit_code: status.code(),
            success: status.success(),
            stdout,
            stderr,
        })
    }

    /// Run a command and fail on a non-zero exit, keeping stderr in the error.
    pub async fn run(&self, cmd: &FfmpegCommand) -> MediaResult<CommandOutput> {
        let output = self.output(cmd).await?;

        if output.success {
            Ok(output)
        } else {
            Err(MediaError::ffmpeg_failed(
                format!(
                    "FFmpeg exited with status {}",
                    output
                        .exit_code
                        .map(|c| c.to_string())
                        .unwrap_or_else(|| "signal".to_string())
                ),
                Some(output.stderr),
                output.exit_code,
            ))
        }
    }

    /// Wait for child process, killing it when the deadline passes.
    async fn wait_for_exit(&self, child: &mut Child) -> MediaResult<ExitStatus> {
        let Some(timeout) = self.timeout else {
            return Ok(child.wait().await?);
        };

        match tokio::time::timeout(timeout, child.wait()).await {
            Ok(status) => Ok(status?),
            Err(_) => {
                warn!(
                    "FFmpeg timed out after {} seconds, killing process",
                    timeout.as_secs()
                );
                if let Err(e) = child.kill().await {
                    warn!("Failed to kill timed-out FFmpeg process: {}", e);
                }
                Err(MediaError::Timeout(timeout.as_secs()))
            }
        }
    }
}

async fn drain<R>(mut reader: R) -> std::io::Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf).await?;
    Ok(buf)
}

async fn collect(handle: JoinHandle<std::io::Result<Vec<u8>>>, stream: &str) -> String {
    match handle.await {
        Ok(Ok(buf)) => String::from_utf8_lossy(&buf).into_owned(),
        Ok(Err(e)) => {
            warn!("Failed to read FFmpeg {}: {}", stream, e);
            String::new()
        }
        Err(e) => {
            warn!("FFmpeg {} reader task failed: {}", stream, e);
            String::new()
        }
    }
}

/// Resolve the FFmpeg executable.
///
/// A value containing a path separator must point at an existing file; a bare
/// name is looked up on `PATH`.
pub fn locate_ffmpeg(program: impl AsRef<Path>) -> MediaResult<PathBuf> {
    let program = program.as_ref();

    if program.components().count() > 1 || program.is_absolute() {
        if program.is_file() {
            return Ok(program.to_path_buf());
        }
        return Err(MediaError::FfmpegNotFound(program.display().to_string()));
    }

    which::which(program).map_err(|_| MediaError::FfmpegNotFound(program.display().to_string()))
}
