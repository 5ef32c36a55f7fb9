use std::collections::BTreeMap;
use std::fmt;
use serde::{Serialize, Deserialize, Deserializer};
use serde_json::{Map, Value};

/// Caller-assigned stable identity of an instance (often its IP address).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogicalId(pub String);

impl LogicalId {
    pub fn new(id: impl Into<String>) -> Self {
        LogicalId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the identity can be embedded in a file name: non-empty, no path
    /// separators, no `..`, no NUL.
    pub fn is_path_safe(&self) -> bool {
        let id = self.0.as_str();
        !id.is_empty()
            && id != "."
            && !id.contains("..")
            && !id.contains(['/', '\\', '\0'])
    }
}

impl fmt::Display for LogicalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LogicalId {
    fn from(s: &str) -> Self {
        LogicalId(s.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment(pub String);

/// Draft of an instance to be created, as handed over by the group controller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InstanceSpec {
    /// Opaque property bag forwarded to the instance plugin.
    #[serde(default, deserialize_with = "null_as_default")]
    pub properties: Map<String, Value>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: BTreeMap<String, String>,

    /// Bootstrap script executed on first boot.
    #[serde(default, deserialize_with = "null_as_default")]
    pub init: String,

    #[serde(rename = "LogicalID", default, skip_serializing_if = "Option::is_none")]
    pub logical_id: Option<LogicalId>,

    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
}

impl InstanceSpec {
    pub fn new(init: impl Into<String>) -> Self {
        Self {
            init: init.into(),
            ..Default::default()
        }
    }

    pub fn with_logical_id(mut self, id: impl Into<LogicalId>) -> Self {
        self.logical_id = Some(id.into());
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }
}

/// Description of an instance that already exists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstanceDescription {
    #[serde(rename = "ID")]
    pub id: String,

    #[serde(rename = "LogicalID", default, skip_serializing_if = "Option::is_none")]
    pub logical_id: Option<LogicalId>,

    #[serde(rename = "Tags", default, deserialize_with = "null_as_default")]
    pub tags: BTreeMap<String, String>,
}

/// How the group allocates instances. Not interpreted by the flavor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AllocationMethod {
    #[serde(rename = "Size", default)]
    pub size: u32,

    #[serde(rename = "LogicalIDs", default, deserialize_with = "null_as_default")]
    pub logical_ids: Vec<LogicalId>,
}

/// Treats an explicit JSON `null` the same as an absent field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
