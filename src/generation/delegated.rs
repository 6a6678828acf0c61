//! Delegated backend: spawn an external agent and read its answer.
//!
//! The prompt never travels on the command line. It is written to an `input_<uuid>.txt`
//! artifact under the work directory and the agent is invoked as
//! `<executable> -p <instruction> --output-format text`, where the instruction names that file.
//! The calling task waits for the agent up to the request timeout; on timeout the child is
//! killed when its handle is dropped. Exit code 0 is success, after which the answer is read
//! from stdout or from the output artifact the request names. The input artifact is removed on
//! every exit path, including a caller dropping the future mid-call.

use super::{GenerationRequest, GenerationResult, OutputChannel, TextGenerator};
use crate::processing::TempArtifact;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;
use tokio::process::Command;

const INPUT_PREFIX: &str = "input_";

/// [`TextGenerator`] that runs an external agent process per call.
pub struct DelegatedGenerator {
    executable: PathBuf,
    work_dir: PathBuf,
}

impl DelegatedGenerator {
    /// Use `executable` as the agent binary, staging prompts under `work_dir`.
    pub fn new(executable: impl Into<PathBuf>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            work_dir: work_dir.into(),
        }
    }

    fn command(&self, input: &Path) -> Command {
        let mut cmd = Command::new(&self.executable);
        cmd.arg("-p")
            .arg(staged_instruction(input))
            .arg("--output-format")
            .arg("text")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

/// Command-line instruction pointing the agent at the staged prompt. The path is the last
/// whitespace-separated token.
fn staged_instruction(input: &Path) -> String {
    format!(
        "次のファイルに書かれた指示と本文を読み、その指示に従って回答のみを出力してください: {}",
        input.display()
    )
}

#[async_trait]
impl TextGenerator for DelegatedGenerator {
    async fn generate(&self, request: &GenerationRequest) -> GenerationResult {
        let input = match TempArtifact::create(&self.work_dir, INPUT_PREFIX, &request.prompt) {
            Ok(artifact) => artifact,
            Err(error) => {
                tracing::error!(error = %error, "Failed to stage prompt for agent");
                return GenerationResult::failed(error.to_string());
            }
        };
        let started = Instant::now();
        let child = match self.command(input.path()).spawn() {
            Ok(child) => child,
            Err(error) if error.kind() == ErrorKind::NotFound => {
                tracing::error!(executable = %self.executable.display(), "Agent executable not found");
                return GenerationResult::failed(format!(
                    "agent executable not found: {}",
                    self.executable.display()
                ));
            }
            Err(error) => {
                tracing::error!(error = %error, "Failed to spawn agent");
                return GenerationResult::failed(format!("failed to spawn agent: {error}"));
            }
        };

        let output = match tokio::time::timeout(request.timeout(), child.wait_with_output()).await
        {
            Ok(Ok(output)) => output,
            Ok(Err(error)) => {
                tracing::error!(error = %error, "Failed to wait for agent");
                return GenerationResult::failed(format!("failed to wait for agent: {error}"));
            }
            Err(_) => {
                tracing::warn!(timeout_seconds = request.timeout_seconds, "Agent timed out");
                return GenerationResult::failed(format!(
                    "[timeout after {}s]",
                    request.timeout_seconds
                ));
            }
        };

        let exit_code = output.status.code().unwrap_or(-1);
        tracing::debug!(
            exit_code,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Agent finished"
        );

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let detail = if stderr.is_empty() {
                format!("agent exited with code {exit_code}")
            } else {
                stderr
            };
            return GenerationResult::failed(detail);
        }

        let text = match &request.output {
            OutputChannel::Stdout => String::from_utf8_lossy(&output.stdout).into_owned(),
            OutputChannel::Artifact(path) => match tokio::fs::read_to_string(path).await {
                Ok(text) => text,
                Err(error) if error.kind() == ErrorKind::NotFound => {
                    return GenerationResult::failed(format!(
                        "expected output artifact missing: {}",
                        path.display()
                    ));
                }
                Err(error) => {
                    return GenerationResult::failed(format!(
                        "failed to read output artifact {}: {error}",
                        path.display()
                    ));
                }
            },
        };

        if text.trim().is_empty() {
            return GenerationResult::failed("empty output");
        }
        GenerationResult::ok(text.trim().to_string())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::config::Backend;
    use std::os::unix::fs::PermissionsExt;
    use std::time::Duration;

    // Inside an agent script, `${2##* }` is the staged prompt path.
    const STAGED: &str = r#""${2##* }""#;

    fn write_agent(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("agent.sh");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write agent");
        let mut permissions = std::fs::metadata(&path).expect("metadata").permissions();
        permissions.set_mode(0o755);
        std::fs::set_permissions(&path, permissions).expect("chmod");
        path
    }

    fn agent_generator(dir: &Path, body: &str) -> DelegatedGenerator {
        DelegatedGenerator::new(write_agent(dir, body), dir.join("work"))
    }

    fn request(prompt: &str, timeout_seconds: u64) -> GenerationRequest {
        GenerationRequest::new(prompt, timeout_seconds, Backend::Delegated)
    }

    fn staged_files(dir: &Path) -> usize {
        std::fs::read_dir(dir.join("work"))
            .map(|entries| entries.count())
            .unwrap_or(0)
    }

    #[tokio::test]
    async fn reads_stdout_on_success() {
        let dir = tempfile::tempdir().expect("tempdir");
        let generator =
            agent_generator(dir.path(), &format!("printf '# echo\\n'\ncat {STAGED}"));

        let result = generator.generate(&request("- hello", 10)).await;

        assert!(result.success, "{}", result.error_detail);
        assert_eq!(result.output, "# echo\n- hello");
    }

    #[tokio::test]
    async fn passes_output_format_flag() {
        let dir = tempfile::tempdir().expect("tempdir");
        let generator = agent_generator(dir.path(), r#"echo "$1 $3 $4""#);

        let result = generator.generate(&request("ignored", 10)).await;

        assert_eq!(result.output, "-p --output-format text");
    }

    #[tokio::test]
    async fn prompt_text_stays_off_the_command_line() {
        let dir = tempfile::tempdir().expect("tempdir");
        let generator = agent_generator(
            dir.path(),
            r#"case "$*" in *body-marker*) echo leaked ;; *) echo clean ;; esac"#,
        );

        let result = generator.generate(&request("body-marker", 10)).await;

        assert_eq!(result.output, "clean");
    }

    #[tokio::test]
    async fn prompt_above_argument_limit_reaches_agent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let generator = agent_generator(dir.path(), &format!("wc -c < {STAGED}"));
        // 150 000 bytes, above the 128 KiB single-argument limit on Linux.
        let prompt = "論".repeat(50_000);

        let result = generator.generate(&request(&prompt, 10)).await;

        assert!(result.success, "{}", result.error_detail);
        assert_eq!(result.output.trim().parse::<usize>(), Ok(prompt.len()));
        assert_eq!(staged_files(dir.path()), 0);
    }

    #[tokio::test]
    async fn staged_prompt_exists_only_during_the_call() {
        let dir = tempfile::tempdir().expect("tempdir");
        let generator =
            agent_generator(dir.path(), &format!(r#"ls "$(dirname {STAGED})" | wc -l"#));

        let result = generator.generate(&request("hello", 10)).await;

        assert_eq!(result.output.trim(), "1");
        assert_eq!(staged_files(dir.path()), 0);
    }

    #[tokio::test]
    async fn non_zero_exit_captures_stderr() {
        let dir = tempfile::tempdir().expect("tempdir");
        let generator = agent_generator(dir.path(), "echo 'rate limited' >&2\nexit 3");

        let result = generator.generate(&request("hello", 10)).await;

        assert!(!result.success);
        assert_eq!(result.error_detail, "rate limited");
        assert_eq!(staged_files(dir.path()), 0);
    }

    #[tokio::test]
    async fn timeout_is_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        let generator = agent_generator(dir.path(), "sleep 5");

        let result = generator.generate(&request("hello", 1)).await;

        assert!(!result.success);
        assert!(result.error_detail.contains("timeout"));
        assert_eq!(staged_files(dir.path()), 0);
    }

    #[tokio::test]
    async fn dropped_call_removes_staged_prompt() {
        let dir = tempfile::tempdir().expect("tempdir");
        let generator = agent_generator(dir.path(), "sleep 5");
        let request = request("hello", 30);

        let outcome =
            tokio::time::timeout(Duration::from_millis(300), generator.generate(&request)).await;

        assert!(outcome.is_err());
        assert_eq!(staged_files(dir.path()), 0);
    }

    #[tokio::test]
    async fn missing_executable_is_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        let generator = DelegatedGenerator::new("/nonexistent/papernote-agent", dir.path());

        let result = generator.generate(&request("hello", 10)).await;

        assert!(!result.success);
        assert!(result.error_detail.contains("not found"));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn unusable_work_dir_is_failure() {
        let dir = tempfile::tempdir().expect("tempdir");
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").expect("write");
        let generator = DelegatedGenerator::new(write_agent(dir.path(), "echo hi"), &blocker);

        let result = generator.generate(&request("hello", 10)).await;

        assert!(!result.success);
        assert!(result.error_detail.contains("work directory"));
    }

    #[tokio::test]
    async fn reads_designated_output_artifact() {
        let dir = tempfile::tempdir().expect("tempdir");
        let out = dir.path().join("result.txt");
        let generator = agent_generator(
            dir.path(),
            &format!("echo 'chatter'\nprintf '# done\\n' > '{}'", out.display()),
        );

        let result = generator
            .generate(&request("hello", 10).with_output(OutputChannel::Artifact(out)))
            .await;

        assert!(result.success, "{}", result.error_detail);
        assert_eq!(result.output, "# done");
    }

    #[tokio::test]
    async fn absent_output_artifact_is_failure() {
        let dir = tempfile::tempdir().expect("tempdir");
        let generator = agent_generator(dir.path(), "echo 'forgot to write the file'");
        let out = dir.path().join("never-written.txt");

        let result = generator
            .generate(&request("hello", 10).with_output(OutputChannel::Artifact(out)))
            .await;

        assert!(!result.success);
        assert!(result.error_detail.contains("missing"));
    }

    #[tokio::test]
    async fn blank_stdout_is_failure() {
        let dir = tempfile::tempdir().expect("tempdir");
        let generator = agent_generator(dir.path(), "exit 0");

        let result = generator.generate(&request("hello", 10)).await;

        assert!(!result.success);
        assert_eq!(result.error_detail, "empty output");
    }
}
