//! Subprocess generation provider.
//!
//! Spawns the configured program once per request, writes the JSON request
//! to its stdin, and reads one JSON response from its stdout. Stderr is
//! captured for error messages. The child is killed if the call times out.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{info, instrument};

use topicpress_shared::{ContentRecord, GeneratorConfig, Result, TopicPressError};

use crate::generator::{ContentGenerator, Draft, GenerationRequest, GenerationResponse};

/// Longest stderr excerpt included in an error.
const STDERR_EXCERPT: usize = 500;

/// Generator backed by an external program speaking JSON over stdio.
#[derive(Debug, Clone)]
pub struct BridgeGenerator {
    cmd: String,
    args: Vec<String>,
    working_dir: Option<String>,
    timeout: Duration,
}

impl BridgeGenerator {
    pub fn new(cmd: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            cmd: cmd.into(),
            args,
            working_dir: None,
            timeout,
        }
    }

    pub fn from_config(config: &GeneratorConfig) -> Self {
        Self {
            cmd: config.bridge_cmd.clone(),
            args: config.bridge_args.clone(),
            working_dir: config.bridge_working_dir.clone(),
            timeout: config.timeout(),
        }
    }

    async fn run(&self, request: Vec<u8>) -> Result<std::process::Output> {
        let mut command = Command::new(&self.cmd);
        command
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }

        let mut child = command.spawn().map_err(|e| {
            TopicPressError::Generation(format!(
                "failed to spawn bridge: {e}. Is `{}` installed?",
                self.cmd
            ))
        })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| TopicPressError::Generation("failed to capture bridge stdin".into()))?;

        // Feed stdin while draining stdout so neither pipe can fill up.
        let write = async move {
            stdin.write_all(&request).await?;
            stdin.shutdown().await
        };
        let (written, output) = tokio::join!(write, child.wait_with_output());

        let output = output
            .map_err(|e| TopicPressError::Generation(format!("bridge wait error: {e}")))?;
        if let Err(e) = written {
            // A provider may exit without reading its input; only report the
            // write failure when the process also failed.
            if !output.status.success() {
                return Err(TopicPressError::Generation(format!(
                    "failed to write to bridge stdin: {e}"
                )));
            }
        }
        Ok(output)
    }
}

#[async_trait]
impl ContentGenerator for BridgeGenerator {
    fn name(&self) -> &'static str {
        "bridge"
    }

    #[instrument(skip_all, fields(cmd = %self.cmd, records = corpus.len()))]
    async fn draft(&self, topic: &str, corpus: &[ContentRecord]) -> Result<Draft> {
        let request = serde_json::to_vec(&GenerationRequest {
            topic,
            contents: corpus,
        })
        .map_err(|e| TopicPressError::Generation(format!("failed to serialize request: {e}")))?;

        info!("running generation bridge");
        let output = tokio::time::timeout(self.timeout, self.run(request))
            .await
            .map_err(|_| {
                TopicPressError::Timeout(format!(
                    "bridge did not answer within {}s",
                    self.timeout.as_secs()
                ))
            })??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let excerpt: String = stderr.trim().chars().take(STDERR_EXCERPT).collect();
            return Err(TopicPressError::Generation(format!(
                "bridge exited with {}: {excerpt}",
                output.status
            )));
        }

        let response: GenerationResponse = serde_json::from_slice(&output.stdout).map_err(|e| {
            let stdout = String::from_utf8_lossy(&output.stdout);
            TopicPressError::Generation(format!(
                "invalid bridge response: {e} (got: {})",
                stdout.chars().take(200).collect::<String>()
            ))
        })?;

        response.into_draft(topic)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use topicpress_shared::ContentBlock;

    fn shell(script: &str, timeout: Duration) -> BridgeGenerator {
        BridgeGenerator::new("sh", vec!["-c".into(), script.into()], timeout)
    }

    #[tokio::test]
    async fn test_bridge_success() {
        let script = r#"cat > /dev/null; printf '%s' '{"title":"From bridge","summary":"S","tags":["Tides"],"content":[{"type":"paragraph","text":"Generated text."}]}'"#;
        let bridge = shell(script, Duration::from_secs(10));

        let draft = bridge.draft("Tides", &[]).await.expect("draft");
        assert_eq!(draft.title, "From bridge");
        assert_eq!(draft.content, vec![ContentBlock::paragraph("Generated text.")]);
    }

    #[tokio::test]
    async fn test_bridge_receives_request() {
        // Echo the request topic back as the title.
        let script = r#"input=$(cat); case "$input" in *'"topic":"Tides"'*) t=ok;; *) t=bad;; esac; printf '{"title":"%s","content":[{"type":"paragraph","text":"x"}]}' "$t""#;
        let bridge = shell(script, Duration::from_secs(10));

        let draft = bridge.draft("Tides", &[]).await.expect("draft");
        assert_eq!(draft.title, "ok");
    }

    #[tokio::test]
    async fn test_bridge_nonzero_exit() {
        let bridge = shell("cat > /dev/null; echo boom >&2; exit 3", Duration::from_secs(10));
        let err = bridge.draft("Tides", &[]).await.unwrap_err();
        assert!(matches!(err, TopicPressError::Generation(_)));
        assert!(err.to_string().contains("boom"));
    }

    #[tokio::test]
    async fn test_bridge_garbage_output() {
        let bridge = shell("cat > /dev/null; echo not-json", Duration::from_secs(10));
        let err = bridge.draft("Tides", &[]).await.unwrap_err();
        assert!(err.to_string().contains("invalid bridge response"));
    }

    #[tokio::test]
    async fn test_bridge_timeout() {
        let bridge = shell("sleep 5", Duration::from_millis(200));
        let err = bridge.draft("Tides", &[]).await.unwrap_err();
        assert!(matches!(err, TopicPressError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_bridge_missing_program() {
        let bridge = BridgeGenerator::new(
            "topicpress-no-such-program",
            vec![],
            Duration::from_secs(1),
        );
        let err = bridge.draft("Tides", &[]).await.unwrap_err();
        assert!(err.to_string().contains("failed to spawn bridge"));
    }
}
