use std::collections::BTreeMap;
use serde::de::{Error as _, Unexpected};
use serde::{Serialize, Deserialize};
use serde_json::Value;
use crate::error::Result;
use crate::instance::{InstanceSpec, null_as_default};

/// Flavor properties of a group: `{"Init": [...], "Tags": {...}}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FlavorSpec {
    /// Bootstrap lines appended, in order, after the instance's own script.
    #[serde(default, deserialize_with = "null_as_default")]
    pub init: Vec<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: BTreeMap<String, String>,
}

impl FlavorSpec {
    pub fn parse(properties: &Value) -> Result<Self> {
        // Derived struct impls also accept JSON arrays; only objects (or null) are valid here.
        match properties {
            Value::Null => Ok(FlavorSpec::default()),
            Value::Array(_) => Err(serde_json::Error::invalid_type(
                Unexpected::Seq,
                &"a flavor properties object",
            )
            .into()),
            _ => Ok(FlavorSpec::deserialize(properties)?),
        }
    }

    /// Existing script (when non-empty) followed by each flavor line, newline-joined.
    pub fn merge_init(&self, existing: &str) -> String {
        let mut lines: Vec<&str> = Vec::with_capacity(self.init.len() + 1);
        if !existing.is_empty() {
            lines.push(existing);
        }
        lines.extend(self.init.iter().map(String::as_str));
        lines.join("\n")
    }

    /// Flavor tags are applied last and win on collision.
    pub fn merge_tags(&self, tags: &mut BTreeMap<String, String>) {
        for (k, v) in &self.tags {
            tags.insert(k.clone(), v.clone());
        }
    }

    /// Applies bootstrap lines and tags onto the draft.
    pub fn apply(&self, spec: &mut InstanceSpec) {
        spec.init = self.merge_init(&spec.init);
        self.merge_tags(&mut spec.tags);
    }
}

/// Parses `properties` and merges them into a copy of `spec`.
pub fn merge(properties: &Value, spec: &InstanceSpec) -> Result<InstanceSpec> {
    let flavor = FlavorSpec::parse(properties)?;
    let mut merged = spec.clone();
    flavor.apply(&mut merged);
    Ok(merged)
}
