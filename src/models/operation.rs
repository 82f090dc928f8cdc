// Manual cluster operations recorded next to observed changes

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{LogLevel, ModelError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Create,
    Delete,
    Update,
    Scale,
    Restart,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Delete => "delete",
            Operation::Update => "update",
            Operation::Scale => "scale",
            Operation::Restart => "restart",
        }
    }

    pub fn level(&self) -> LogLevel {
        match self {
            Operation::Delete => LogLevel::Warning,
            Operation::Create => LogLevel::Success,
            _ => LogLevel::Info,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "create" => Ok(Operation::Create),
            "delete" => Ok(Operation::Delete),
            "update" => Ok(Operation::Update),
            "scale" => Ok(Operation::Scale),
            "restart" => Ok(Operation::Restart),
            _ => Err(ModelError::UnknownOperation(s.to_string())),
        }
    }
}

/// The resource an operation acted on, e.g. `deployment/web`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRef {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
}

impl ResourceRef {
    pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
        }
    }
}
