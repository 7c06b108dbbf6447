use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One entry of a tech-stack list.
///
/// Fields other than `name` and `icon` (`_key`, `_type`, ...) are kept in
/// `extra` so a wholesale write-back leaves them as they were.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Item {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Item {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            icon: None,
            extra: Map::new(),
        }
    }

    pub fn with_icon(name: impl Into<String>, icon: impl Into<String>) -> Self {
        Self {
            icon: Some(icon.into()),
            ..Self::new(name)
        }
    }

    /// The icon, if present and not blank.
    pub fn icon(&self) -> Option<&str> {
        self.icon
            .as_deref()
            .filter(|icon| !icon.trim().is_empty())
    }

    pub fn has_icon(&self) -> bool {
        self.icon().is_some()
    }
}
