use async_trait::async_trait;
use std::fmt::Debug;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, error};
use crate::error::{FlavorError, Result};
use crate::script::Script;

/// Runs a provisioning script and returns its captured stdout.
#[async_trait]
pub trait ScriptExecutor: Send + Sync + Debug {
    async fn run(&self, script: &Script, args: &[String]) -> Result<String>;
}

/// Feeds the script body to `bash -s` on stdin; every argument is passed as its own
/// positional parameter.
#[derive(Debug, Clone)]
pub struct BashExecutor {
    shell: String,
    timeout: Duration,
}

impl BashExecutor {
    pub fn new(timeout: Duration) -> Self {
        Self {
            shell: "bash".to_string(),
            timeout,
        }
    }

    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }
}

/// Any failure to drive the subprocess belongs to the script, not to the caller.
fn subprocess_error(script: &str, stage: &str, e: std::io::Error) -> FlavorError {
    error!(script, stage, error = %e, "Subprocess error");
    FlavorError::script_failure(script, format!("{}: {}", stage, e))
}

impl Default for BashExecutor {
    fn default() -> Self {
        Self::new(Duration::from_secs(120))
    }
}

#[async_trait]
impl ScriptExecutor for BashExecutor {
    async fn run(&self, script: &Script, args: &[String]) -> Result<String> {
        debug!(script = script.name, ?args, "Running script");

        let mut child = Command::new(&self.shell)
            .arg("-s")
            .arg("--")
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| subprocess_error(script.name, &format!("spawn {}", self.shell), e))?;

        // Written from a separate task so a chatty script can't fill stdout while we block on stdin.
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| FlavorError::script_failure(script.name, "stdin not captured"))?;
        let body = script.body;
        let writer = tokio::spawn(async move {
            let res = stdin.write_all(body.as_bytes()).await;
            drop(stdin);
            res
        });

        let output = match timeout(self.timeout, child.wait_with_output()).await {
            Ok(res) => res.map_err(|e| subprocess_error(script.name, "wait", e))?,
            Err(_) => {
                error!(script = script.name, "Script timed out after {:?}", self.timeout);
                return Err(FlavorError::ScriptTimeout {
                    script: script.name.to_string(),
                    timeout: self.timeout,
                });
            }
        };

        match writer.await {
            Ok(Err(e)) if e.kind() != std::io::ErrorKind::BrokenPipe => {
                return Err(subprocess_error(script.name, "write stdin", e));
            }
            Err(e) => return Err(FlavorError::script_failure(script.name, e)),
            _ => {}
        }

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            error!(script = script.name, status = %output.status, stderr = %stderr.trim(), "Error in bash script");
            return Err(FlavorError::script_failure(
                script.name,
                format!("{}: {}", output.status, stderr.trim()),
            ));
        }

        debug!(script = script.name, output = %stdout.trim_end(), "Script finished");
        Ok(stdout)
    }
}
