pub mod provisioner;
pub mod tool;

pub use provisioner::CertificateProvisioner;
pub use tool::{CertificateAuthorityTool, CredentialRequest, ScriptCertificateTool};
