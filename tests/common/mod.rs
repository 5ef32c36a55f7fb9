#![allow(dead_code)]

use async_trait::async_trait;
use kube_flavor::certs::{CertificateAuthorityTool, CredentialRequest};
use kube_flavor::error::{FlavorError, Result};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Init(PathBuf),
    Issue { cn: String, san: String },
}

/// Records every invocation and writes empty bundles where the real scripts would.
#[derive(Debug, Default)]
pub struct RecordingTool {
    pub calls: Mutex<Vec<Call>>,
    pub fail_cn: Option<String>,
    pub delay: Option<Duration>,
    /// Overrides `delay` for node credentials (those carrying SAN addresses).
    pub node_delay: Option<Duration>,
    in_authority: AtomicBool,
    pub authority_overlaps: AtomicUsize,
    issuing: AtomicUsize,
    pub max_parallel_issues: AtomicUsize,
    node_issuing: AtomicUsize,
    pub max_parallel_node_issues: AtomicUsize,
}

impl RecordingTool {
    pub fn failing_on(cn: &str) -> Self {
        Self {
            fail_cn: Some(cn.to_string()),
            ..Default::default()
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Default::default()
        }
    }

    /// Short authority section, long node issuance.
    pub fn slow_nodes(authority: Duration, node: Duration) -> Self {
        Self {
            delay: Some(authority),
            node_delay: Some(node),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    async fn pause(&self, node: bool) {
        let delay = if node { self.node_delay.or(self.delay) } else { self.delay };
        if let Some(d) = delay {
            tokio::time::sleep(d).await;
        }
    }
}

#[async_trait]
impl CertificateAuthorityTool for RecordingTool {
    async fn init_authority(&self, dir: &Path) -> Result<()> {
        if self.in_authority.swap(true, Ordering::SeqCst) {
            self.authority_overlaps.fetch_add(1, Ordering::SeqCst);
        }
        self.calls.lock().unwrap().push(Call::Init(dir.to_path_buf()));
        std::fs::create_dir_all(dir)?;
        self.pause(false).await;
        Ok(())
    }

    async fn issue_credential(&self, dir: &Path, request: &CredentialRequest) -> Result<()> {
        let admin = request.subject_alt_ips.is_empty();
        self.calls.lock().unwrap().push(Call::Issue {
            cn: request.common_name.clone(),
            san: request.san_argument(),
        });

        let now = self.issuing.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_parallel_issues.fetch_max(now, Ordering::SeqCst);
        if !admin {
            let nodes = self.node_issuing.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_parallel_node_issues.fetch_max(nodes, Ordering::SeqCst);
        }
        self.pause(!admin).await;
        if !admin {
            self.node_issuing.fetch_sub(1, Ordering::SeqCst);
        }
        self.issuing.fetch_sub(1, Ordering::SeqCst);

        if admin {
            // Admin issuance closes the authority section.
            self.in_authority.store(false, Ordering::SeqCst);
        }
        if self.fail_cn.as_deref() == Some(request.common_name.as_str()) {
            return Err(FlavorError::script_failure("init-ssl", "exit status: 1"));
        }
        std::fs::write(dir.join(format!("{}.tar", request.common_name)), b"")?;
        Ok(())
    }
}
