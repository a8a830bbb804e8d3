//! Plugin host adapter.
//!
//! The host invokes backend methods by name and expects JSON back.
//! [`Plugin::call`] is that entry point; each callable maps onto a
//! [`BranchReader`] operation.

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::branch::{BranchReader, Channel};

/// Method names the host may call.
pub const CALLABLES: &[&str] = &["get_bazzite_branch", "is_bazzite_branch_testing"];

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PluginError {
    #[error("Unknown plugin method '{0}'")]
    UnknownMethod(String),
}

/// Backend half of the changelog plugin.
#[derive(Debug, Clone, Default)]
pub struct Plugin {
    reader: BranchReader,
}

impl Plugin {
    pub fn new(reader: BranchReader) -> Self {
        Self { reader }
    }

    pub fn reader(&self) -> &BranchReader {
        &self.reader
    }

    /// Current image branch, as reported to the host.
    pub async fn get_bazzite_branch(&self) -> Option<String> {
        self.reader.get_branch().await
    }

    pub async fn is_bazzite_branch_testing(&self) -> bool {
        self.reader.channel().await == Channel::Testing
    }

    /// Dispatch a host call by method name.
    #[instrument(skip(self))]
    pub async fn call(&self, method: &str) -> Result<Value, PluginError> {
        let value = match method {
            "get_bazzite_branch" => self
                .get_bazzite_branch()
                .await
                .map_or(Value::Null, Value::String),
            "is_bazzite_branch_testing" => Value::Bool(self.is_bazzite_branch_testing().await),
            other => return Err(PluginError::UnknownMethod(other.to_string())),
        };

        debug!(result = %value, "plugin call complete");
        Ok(value)
    }
}
