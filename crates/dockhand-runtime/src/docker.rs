//! Docker CLI runtime implementation

use crate::error::{Result, RuntimeError};
use crate::traits::{ContainerRuntime, ContainerSummary, HelperSpec, HELPER_LABEL};
use crate::utils::{command_exists, parse_label_list};
use async_trait::async_trait;
use serde::Deserialize;
use std::io::{Read, Write};
use std::process::{Output, Stdio};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Chunk size used when streaming `docker cp` archives
const COPY_CHUNK_SIZE: usize = 64 * 1024;

/// Runtime backed by the `docker` command line client
#[derive(Debug, Clone)]
pub struct DockerCli {
    binary: String,
}

/// One line of `docker ps --format '{{json .}}'`
#[derive(Debug, Deserialize)]
struct PsLine {
    #[serde(rename = "ID")]
    id: String,
    #[serde(rename = "Names", default)]
    names: String,
    #[serde(rename = "Image", default)]
    image: String,
    #[serde(rename = "State", default)]
    state: String,
    #[serde(rename = "Labels", default)]
    labels: String,
}

impl From<PsLine> for ContainerSummary {
    fn from(line: PsLine) -> Self {
        // `Names` may hold several comma-separated aliases; the first is canonical
        let name = line.names.split(',').next().unwrap_or_default().to_string();
        ContainerSummary {
            id: line.id,
            name,
            image: line.image,
            state: line.state.to_lowercase(),
            labels: parse_label_list(&line.labels),
        }
    }
}

impl Default for DockerCli {
    fn default() -> Self {
        Self::new()
    }
}

impl DockerCli {
    /// Create a runtime using `docker` from PATH
    pub fn new() -> Self {
        Self::with_binary("docker")
    }

    /// Create a runtime using a specific CLI binary (e.g. `podman`)
    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    /// Check that the CLI is installed and the daemon answers
    pub async fn check_available(&self) -> Result<String> {
        if !command_exists(&self.binary) {
            return Err(RuntimeError::NotInstalled {
                binary: self.binary.clone(),
            });
        }
        self.run(&["version", "--format", "{{.Server.Version}}"])
            .await
            .map(|v| v.trim().to_string())
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.args(args).kill_on_drop(true);
        cmd
    }

    fn describe(&self, args: &[&str]) -> String {
        format!("{} {}", self.binary, args.join(" "))
    }

    /// Run a command to completion and return its stdout
    async fn run(&self, args: &[&str]) -> Result<String> {
        let command = self.describe(args);
        debug!("Running: {}", command);

        let output: Output = self
            .command(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| RuntimeError::Spawn {
                command: command.clone(),
                source,
            })?;

        if !output.status.success() {
            let err = RuntimeError::command_failed(command, output.status.code(), &output.stderr);
            warn!("{}", err);
            return Err(err);
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Drain a child's stderr in the background so it never blocks the pipe
fn collect_stderr<R>(stderr: Option<R>) -> JoinHandle<Vec<u8>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Some(mut stderr) = stderr {
            let _ = stderr.read_to_end(&mut buf).await;
        }
        buf
    })
}

#[async_trait]
impl ContainerRuntime for DockerCli {
    fn name(&self) -> &'static str {
        "docker"
    }

    async fn list_volumes(&self) -> Result<Vec<String>> {
        let stdout = self.run(&["volume", "ls", "--format", "{{.Name}}"]).await?;
        Ok(stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }

    async fn list_containers(&self, all: bool) -> Result<Vec<ContainerSummary>> {
        let mut args = vec!["ps", "--no-trunc", "--format", "{{json .}}"];
        if all {
            args.push("--all");
        }
        let stdout = self.run(&args).await?;

        stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(|line| {
                serde_json::from_str::<PsLine>(line)
                    .map(ContainerSummary::from)
                    .map_err(|e| RuntimeError::parse(format!("docker ps line: {}", e)))
            })
            .collect()
    }

    async fn create_helper(&self, spec: &HelperSpec) -> Result<String> {
        let mount = format!("{}:{}", spec.volume, spec.mount_point);
        let label = format!("{}=true", HELPER_LABEL);
        let mut args = vec![
            "create",
            "--name",
            spec.name.as_str(),
            "--label",
            label.as_str(),
            "--network",
            "none",
            "-v",
            mount.as_str(),
            spec.image.as_str(),
        ];
        args.extend(spec.command.iter().map(String::as_str));

        let stdout = self.run(&args).await?;
        let id = stdout.trim().to_string();
        if id.is_empty() {
            return Err(RuntimeError::parse("docker create printed no container id"));
        }
        debug!("Created helper {} ({}) for volume {}", spec.name, id, spec.volume);
        Ok(id)
    }

    async fn start_container(&self, id: &str) -> Result<()> {
        self.run(&["start", id]).await.map(|_| ())
    }

    async fn stop_container(&self, id: &str) -> Result<()> {
        self.run(&["stop", id]).await.map(|_| ())
    }

    async fn remove_container(&self, id: &str, force: bool) -> Result<()> {
        let mut args = vec!["rm"];
        if force {
            args.push("-f");
        }
        args.push(id);
        self.run(&args).await.map(|_| ())
    }

    async fn copy_from_container(
        &self,
        id: &str,
        path: &str,
        sink: &mut (dyn Write + Send),
    ) -> Result<u64> {
        // A trailing "/." makes docker root the archive at the directory itself
        let source = format!("{}:{}/.", id, path.trim_end_matches('/'));
        let args = ["cp", source.as_str(), "-"];
        let command = self.describe(&args);
        debug!("Streaming: {}", command);

        let mut child = self
            .command(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| RuntimeError::Spawn {
                command: command.clone(),
                source,
            })?;

        let stderr_task = collect_stderr(child.stderr.take());
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| RuntimeError::parse("docker cp stdout was not captured"))?;

        let mut buf = vec![0u8; COPY_CHUNK_SIZE];
        let mut copied = 0u64;
        let streamed = async {
            loop {
                let n = stdout.read(&mut buf).await?;
                if n == 0 {
                    break;
                }
                sink.write_all(&buf[..n])?;
                copied += n as u64;
            }
            sink.flush()?;
            Ok::<(), RuntimeError>(())
        }
        .await;

        if let Err(e) = streamed {
            let _ = child.kill().await;
            return Err(e);
        }

        let status = child.wait().await?;
        let stderr = stderr_task.await.unwrap_or_default();
        if !status.success() {
            return Err(RuntimeError::command_failed(command, status.code(), &stderr));
        }

        Ok(copied)
    }

    async fn copy_into_container(
        &self,
        id: &str,
        path: &str,
        source: &mut (dyn Read + Send),
    ) -> Result<u64> {
        let target = format!("{}:{}", id, path);
        let args = ["cp", "-", target.as_str()];
        let command = self.describe(&args);
        debug!("Streaming: {}", command);

        let mut child = self
            .command(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| RuntimeError::Spawn {
                command: command.clone(),
                source,
            })?;

        let stderr_task = collect_stderr(child.stderr.take());
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| RuntimeError::parse("docker cp stdin was not captured"))?;

        let mut buf = vec![0u8; COPY_CHUNK_SIZE];
        let mut copied = 0u64;
        let streamed = async {
            loop {
                let n = source.read(&mut buf)?;
                if n == 0 {
                    break;
                }
                stdin.write_all(&buf[..n]).await?;
                copied += n as u64;
            }
            stdin.shutdown().await?;
            Ok::<(), RuntimeError>(())
        }
        .await;
        drop(stdin);

        if let Err(e) = streamed {
            let _ = child.kill().await;
            return Err(e);
        }

        let status = child.wait().await?;
        let stderr = stderr_task.await.unwrap_or_default();
        if !status.success() {
            return Err(RuntimeError::command_failed(command, status.code(), &stderr));
        }

        Ok(copied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_docker_cli_creation() {
        let runtime = DockerCli::new();
        assert_eq!(runtime.name(), "docker");
        assert_eq!(runtime.binary(), "docker");

        let runtime = DockerCli::with_binary("podman");
        assert_eq!(runtime.binary(), "podman");
    }

    #[test]
    fn test_ps_line_into_summary() {
        let line = r#"{"Command":"\"nginx -g\"","ID":"4f1c2e","Image":"nginx:1.27","Labels":"autostop=true,tier=web","Names":"web,web-alias","State":"running","Status":"Up 2 hours"}"#;
        let parsed: PsLine = serde_json::from_str(line).unwrap();
        let summary = ContainerSummary::from(parsed);

        assert_eq!(summary.id, "4f1c2e");
        assert_eq!(summary.name, "web");
        assert_eq!(summary.image, "nginx:1.27");
        assert!(summary.is_running());
        assert!(summary.has_flag("autostop"));
        assert_eq!(summary.labels.get("tier").map(String::as_str), Some("web"));
    }

    #[test]
    fn test_ps_line_missing_optional_fields() {
        let parsed: PsLine = serde_json::from_str(r#"{"ID":"abc"}"#).unwrap();
        let summary = ContainerSummary::from(parsed);
        assert_eq!(summary.id, "abc");
        assert!(summary.name.is_empty());
        assert!(summary.labels.is_empty());
    }

    #[tokio::test]
    async fn test_missing_binary_is_reported() {
        let runtime = DockerCli::with_binary("dockhand-no-such-binary");
        let err = runtime.check_available().await.unwrap_err();
        assert!(matches!(err, RuntimeError::NotInstalled { .. }));

        let err = runtime.list_volumes().await.unwrap_err();
        assert!(matches!(err, RuntimeError::Spawn { .. }));
    }
}
