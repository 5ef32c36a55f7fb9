use async_trait::async_trait;
use serde_json::Value;
use std::fmt::Debug;
use std::sync::Arc;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;
use crate::certs::{CertificateAuthorityTool, CertificateProvisioner, CredentialRequest, ScriptCertificateTool};
use crate::config::PluginConfig;
use crate::error::{FlavorError, Result};
use crate::flavor::probe::{Health, InstanceProbe, NoopProbe};
use crate::flavor::spec::{merge, FlavorSpec};
use crate::instance::{AllocationMethod, InstanceDescription, InstanceSpec};
use crate::script::BashExecutor;

/// Contract between the group controller and a flavor.
#[async_trait]
pub trait FlavorPlugin: Send + Sync + Debug {
    fn name(&self) -> &str;

    /// Rejects flavor properties that don't have the expected shape.
    fn validate(&self, properties: &Value, allocation: &AllocationMethod) -> Result<()>;

    async fn healthy(&self, properties: &Value, instance: &InstanceDescription) -> Result<Health>;

    async fn drain(&self, properties: &Value, instance: &InstanceDescription) -> Result<()>;

    /// Returns a finalized copy of `spec`. On error `spec` is left as the caller passed it.
    async fn prepare(
        &self,
        properties: &Value,
        spec: &InstanceSpec,
        allocation: &AllocationMethod,
    ) -> Result<InstanceSpec>;
}

/// Flavor turning generic instances into kubernetes nodes with their own TLS bundle.
#[derive(Debug)]
pub struct KubernetesFlavor {
    name: String,
    config: PluginConfig,
    provisioner: CertificateProvisioner,
    probe: Arc<dyn InstanceProbe>,
}

impl KubernetesFlavor {
    pub fn new(config: PluginConfig, tool: Arc<dyn CertificateAuthorityTool>) -> Self {
        let admin = CredentialRequest::new(&config.admin_base_name, &config.admin_common_name);
        let provisioner = CertificateProvisioner::new(tool)
            .with_admin(admin)
            .with_bundle_prefix(config.bundle_prefix.clone())
            .with_verify_bundle(config.verify_bundle);
        Self {
            name: "flavor-kubernetes".to_string(),
            config,
            provisioner,
            probe: Arc::new(NoopProbe),
        }
    }

    /// Issues certificates with the embedded scripts.
    pub fn from_config(config: PluginConfig) -> Self {
        let executor = BashExecutor::new(config.script_timeout()).with_shell(&config.shell);
        let tool = ScriptCertificateTool::new(Arc::new(executor));
        Self::new(config, Arc::new(tool))
    }

    pub fn with_probe(mut self, probe: Arc<dyn InstanceProbe>) -> Self {
        self.probe = probe;
        self
    }

    /// Name the plugin is advertised under.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    fn lenient_spec(properties: &Value) -> FlavorSpec {
        FlavorSpec::parse(properties).unwrap_or_else(|e| {
            warn!(error = %e, "Ignoring malformed flavor properties");
            FlavorSpec::default()
        })
    }

    async fn prepare_inner(&self, properties: &Value, spec: &InstanceSpec) -> Result<InstanceSpec> {
        // 1. Parse & merge bootstrap lines and tags, before any side effect
        let mut prepared = merge(properties, spec)?;

        // 2. The logical ID becomes the common name and a file name in the ssl dir
        let logical_id = spec.logical_id.as_ref().ok_or_else(|| {
            FlavorError::PreconditionViolation(
                "instance has no logical ID to derive the certificate common name from".to_string(),
            )
        })?;
        if !logical_id.is_path_safe() {
            return Err(FlavorError::PreconditionViolation(format!(
                "logical ID {:?} cannot be used as a certificate file name",
                logical_id.as_str()
            )));
        }

        // 3. Authority, admin and node credentials
        let common_name = format!("{}{}", self.config.node_cn_prefix, logical_id);
        let ips = vec![logical_id.to_string(), self.config.apiserver_service_ip.clone()];
        let bundle = self
            .provisioner
            .provision_node_certificate(
                &self.config.ssl_dir,
                &self.config.node_base_name,
                &common_name,
                &ips,
            )
            .await?;

        // 4. Record bundle reference
        prepared
            .properties
            .insert(self.config.properties_key.clone(), Value::String(bundle));

        info!(logical_id = %logical_id, "Prepared instance");
        Ok(prepared)
    }
}

#[async_trait]
impl FlavorPlugin for KubernetesFlavor {
    fn name(&self) -> &str {
        &self.name
    }

    fn validate(&self, properties: &Value, _allocation: &AllocationMethod) -> Result<()> {
        FlavorSpec::parse(properties).map(|_| ())
    }

    async fn healthy(&self, properties: &Value, instance: &InstanceDescription) -> Result<Health> {
        let flavor = Self::lenient_spec(properties);
        self.probe.health(&flavor, instance).await
    }

    async fn drain(&self, properties: &Value, instance: &InstanceDescription) -> Result<()> {
        let flavor = Self::lenient_spec(properties);
        self.probe.drain(&flavor, instance).await
    }

    async fn prepare(
        &self,
        properties: &Value,
        spec: &InstanceSpec,
        _allocation: &AllocationMethod,
    ) -> Result<InstanceSpec> {
        let request_id = Uuid::new_v4();
        let logical_id = spec.logical_id.as_ref().map(|id| id.to_string()).unwrap_or_default();
        let span = info_span!("prepare", %request_id, logical_id = %logical_id);
        self.prepare_inner(properties, spec).instrument(span).await
    }
}
