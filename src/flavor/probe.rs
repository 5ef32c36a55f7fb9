use async_trait::async_trait;
use serde::{Serialize, Deserialize};
use std::fmt;
use std::fmt::Debug;
use crate::error::Result;
use crate::flavor::spec::FlavorSpec;
use crate::instance::InstanceDescription;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Health {
    Unknown,
    Healthy,
    Unhealthy,
}

impl fmt::Display for Health {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Health::Unknown => "unknown",
            Health::Healthy => "healthy",
            Health::Unhealthy => "unhealthy",
        };
        f.write_str(s)
    }
}

/// Health and drain hooks for instances created with a flavor.
#[async_trait]
pub trait InstanceProbe: Send + Sync + Debug {
    async fn health(&self, flavor: &FlavorSpec, instance: &InstanceDescription) -> Result<Health>;
    async fn drain(&self, flavor: &FlavorSpec, instance: &InstanceDescription) -> Result<()>;
}

/// Reports every instance healthy and drainable without touching it.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProbe;

#[async_trait]
impl InstanceProbe for NoopProbe {
    async fn health(&self, _flavor: &FlavorSpec, _instance: &InstanceDescription) -> Result<Health> {
        Ok(Health::Healthy)
    }

    async fn drain(&self, _flavor: &FlavorSpec, _instance: &InstanceDescription) -> Result<()> {
        Ok(())
    }
}
