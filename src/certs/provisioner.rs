use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use crate::certs::tool::{CertificateAuthorityTool, CredentialRequest};
use crate::error::{FlavorError, Result};

/// Issues per-node credential bundles against a shared certificate authority.
///
/// The authority living in a working directory is shared mutable state: creating it
/// and issuing the admin credential happen under a lock scoped to that directory.
/// Node credentials for distinct common names are issued outside the lock.
#[derive(Debug)]
pub struct CertificateProvisioner {
    tool: Arc<dyn CertificateAuthorityTool>,
    admin: CredentialRequest,
    bundle_prefix: Option<PathBuf>,
    verify_bundle: bool,
    // Map<WorkingDir, AuthorityLock>
    locks: DashMap<PathBuf, Arc<Mutex<()>>>,
}

impl CertificateProvisioner {
    pub fn new(tool: Arc<dyn CertificateAuthorityTool>) -> Self {
        Self {
            tool,
            admin: CredentialRequest::new("admin", "kube-admin"),
            bundle_prefix: None,
            verify_bundle: true,
            locks: DashMap::new(),
        }
    }

    pub fn with_admin(mut self, admin: CredentialRequest) -> Self {
        self.admin = admin;
        self
    }

    /// Records bundles under `prefix` instead of the working directory. The prefix
    /// must name the same location the tool writes to; it is what gets verified.
    pub fn with_bundle_prefix(mut self, prefix: Option<PathBuf>) -> Self {
        self.bundle_prefix = prefix;
        self
    }

    pub fn with_verify_bundle(mut self, verify: bool) -> Self {
        self.verify_bundle = verify;
        self
    }

    /// Where a node's bundle lives: `<dir>/<cn>.tar`, or `<prefix>/<cn>.tar` when a
    /// prefix is configured.
    pub fn bundle_path(&self, dir: &Path, common_name: &str) -> PathBuf {
        self.bundle_prefix
            .as_deref()
            .unwrap_or(dir)
            .join(format!("{}.tar", common_name))
    }

    fn authority_lock(&self, dir: &Path) -> Arc<Mutex<()>> {
        // "ssl" and "./ssl" must share one lock even before the directory exists.
        let key = std::path::absolute(dir).unwrap_or_else(|_| dir.to_path_buf());
        self.locks.entry(key).or_default().value().clone()
    }

    /// Creates the authority for `dir` if needed and issues the admin credential.
    pub async fn ensure_authority(&self, dir: &Path) -> Result<()> {
        let lock = self.authority_lock(dir);
        let _guard = lock.lock().await;
        debug!(dir = %dir.display(), "Holding authority lock");

        self.tool.init_authority(dir).await?;
        self.issue(dir, &self.admin).await
    }

    async fn issue(&self, dir: &Path, request: &CredentialRequest) -> Result<()> {
        self.tool
            .issue_credential(dir, request)
            .await
            .map_err(|e| FlavorError::Credential {
                common_name: request.common_name.clone(),
                source: Box::new(e),
            })
    }

    /// Issues a node credential and returns the reference of its bundle.
    ///
    /// Runs [`ensure_authority`](Self::ensure_authority) first, so every bundle
    /// chains to the authority of `dir`.
    pub async fn provision_node_certificate(
        &self,
        dir: &Path,
        cert_base_name: &str,
        common_name: &str,
        subject_alt_ips: &[String],
    ) -> Result<String> {
        if common_name.is_empty() {
            return Err(FlavorError::PreconditionViolation(
                "certificate common name must not be empty".to_string(),
            ));
        }

        self.ensure_authority(dir).await?;

        let request = CredentialRequest::new(cert_base_name, common_name)
            .with_ips(subject_alt_ips.iter().cloned());
        self.issue(dir, &request).await?;

        let bundle = self.bundle_path(dir, common_name);
        if self.verify_bundle && !tokio::fs::try_exists(&bundle).await? {
            warn!(path = %bundle.display(), "Credential bundle missing after issuance");
            return Err(FlavorError::MissingBundle(bundle));
        }

        let reference = bundle.to_string_lossy().into_owned();
        info!(cn = common_name, bundle = %reference, "Provisioned node certificate");
        Ok(reference)
    }
}
