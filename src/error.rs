use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by the flavor plugin.
#[derive(Error, Debug)]
pub enum FlavorError {
    #[error("invalid flavor properties: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("script {script} failed: {detail}")]
    ScriptFailure { script: String, detail: String },

    #[error("script {script} timed out after {timeout:?}")]
    ScriptTimeout { script: String, timeout: Duration },

    #[error("embedded script not found: {0}")]
    MissingAsset(String),

    #[error("expected credential bundle was not written: {}", .0.display())]
    MissingBundle(PathBuf),

    #[error("issuing credential {common_name}: {source}")]
    Credential {
        common_name: String,
        #[source]
        source: Box<FlavorError>,
    },

    #[error("precondition violated: {0}")]
    PreconditionViolation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FlavorError {
    pub fn script_failure(script: impl Into<String>, detail: impl ToString) -> Self {
        FlavorError::ScriptFailure {
            script: script.into(),
            detail: detail.to_string(),
        }
    }

    /// True for every error raised because the external tool misbehaved: a non-zero
    /// exit, a spawn failure, a timeout, or a bundle it claimed to write but didn't.
    pub fn is_script_failure(&self) -> bool {
        if let FlavorError::Credential { source, .. } = self {
            return source.is_script_failure();
        }
        matches!(
            self,
            FlavorError::ScriptFailure { .. }
                | FlavorError::ScriptTimeout { .. }
                | FlavorError::MissingAsset(_)
                | FlavorError::MissingBundle(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, FlavorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_failure_class() {
        assert!(FlavorError::script_failure("init-ssl", "exit status: 1").is_script_failure());
        assert!(FlavorError::MissingBundle(PathBuf::from("ssl/x.tar")).is_script_failure());
        let wrapped = FlavorError::Credential {
            common_name: "kube-admin".into(),
            source: Box::new(FlavorError::script_failure("init-ssl", "exit status: 2")),
        };
        assert!(wrapped.is_script_failure());
        assert!(wrapped.to_string().contains("kube-admin"));
        assert!(!FlavorError::PreconditionViolation("no logical id".into()).is_script_failure());
    }

    #[test]
    fn parse_errors_convert() {
        let err: FlavorError = serde_json::from_str::<Vec<String>>("{").unwrap_err().into();
        assert!(matches!(err, FlavorError::ConfigParse(_)));
        assert!(err.to_string().starts_with("invalid flavor properties"));
    }
}
