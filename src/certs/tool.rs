use async_trait::async_trait;
use std::fmt::Debug;
use std::path::Path;
use std::sync::Arc;
use tracing::info;
use crate::error::Result;
use crate::script::assets::{INIT_SSL, INIT_SSL_CA};
use crate::script::{Script, ScriptExecutor};

/// One credential to be issued by the certificate authority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialRequest {
    /// File stem of the key/cert pair inside the bundle (`<base>.pem`, `<base>-key.pem`).
    pub base_name: String,
    pub common_name: String,
    pub subject_alt_ips: Vec<String>,
}

impl CredentialRequest {
    pub fn new(base_name: impl Into<String>, common_name: impl Into<String>) -> Self {
        Self {
            base_name: base_name.into(),
            common_name: common_name.into(),
            subject_alt_ips: Vec::new(),
        }
    }

    pub fn with_ips<I, S>(mut self, ips: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.subject_alt_ips.extend(ips.into_iter().map(Into::into));
        self
    }

    /// `IP.1=<a>,IP.2=<b>,...`, numbered from one in the given order.
    pub fn san_argument(&self) -> String {
        self.subject_alt_ips
            .iter()
            .enumerate()
            .map(|(i, ip)| format!("IP.{}={}", i + 1, ip))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// The certificate authority backing a working directory.
#[async_trait]
pub trait CertificateAuthorityTool: Send + Sync + Debug {
    /// Creates the authority in `dir`. Must leave an existing authority untouched.
    async fn init_authority(&self, dir: &Path) -> Result<()>;

    /// Issues a credential signed by the authority in `dir` and packages it as
    /// `<dir>/<common_name>.tar`.
    async fn issue_credential(&self, dir: &Path, request: &CredentialRequest) -> Result<()>;
}

/// Drives the embedded `init-ssl-ca` / `init-ssl` scripts.
#[derive(Debug, Clone)]
pub struct ScriptCertificateTool {
    executor: Arc<dyn ScriptExecutor>,
}

impl ScriptCertificateTool {
    pub fn new(executor: Arc<dyn ScriptExecutor>) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl CertificateAuthorityTool for ScriptCertificateTool {
    async fn init_authority(&self, dir: &Path) -> Result<()> {
        let script = Script::lookup(INIT_SSL_CA)?;
        self.executor
            .run(&script, &[dir.to_string_lossy().into_owned()])
            .await?;
        info!(dir = %dir.display(), "Certificate authority ready");
        Ok(())
    }

    async fn issue_credential(&self, dir: &Path, request: &CredentialRequest) -> Result<()> {
        let script = Script::lookup(INIT_SSL)?;
        let mut args = vec![
            dir.to_string_lossy().into_owned(),
            request.base_name.clone(),
            request.common_name.clone(),
        ];
        if !request.subject_alt_ips.is_empty() {
            args.push(request.san_argument());
        }

        self.executor.run(&script, &args).await?;
        info!(dir = %dir.display(), cn = %request.common_name, "Issued credential");
        Ok(())
    }
}
