//! 工具注册表：启动时静态注册，运行期只读
//!
//! Tool registry. Populated once at startup from the static tool catalog and shared
//! read-only (behind an `Arc`) by every in-flight call; no locks are needed.

use std::collections::{HashMap, HashSet};

use crate::schema::{ArgumentValidator, ToolDescriptor, ValidatedArguments};
use crate::{Error, Result};

/// Name-unique set of tool descriptors plus the argument policy applied to all of them.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    /// Descriptors in registration order (drives `tools/list` ordering).
    tools: Vec<ToolDescriptor>,
    /// Name -> index into `tools`.
    index: HashMap<String, usize>,
    /// Names hidden from listing and dispatch.
    ignored: HashSet<String>,
    validator: ArgumentValidator,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the unknown-field policy (strict rejects, lenient drops).
    pub fn with_validator(mut self, validator: ArgumentValidator) -> Self {
        self.validator = validator;
        self
    }

    /// Hide tools by name. They stay registered but are neither listed nor dispatchable.
    pub fn with_ignored<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignored = names.into_iter().map(Into::into).collect();
        self
    }

    /// Register a descriptor. Fails without modifying the registry if the name is taken.
    pub fn register(&mut self, descriptor: ToolDescriptor) -> Result<()> {
        if self.index.contains_key(&descriptor.name) {
            return Err(Error::DuplicateTool(descriptor.name));
        }
        self.index
            .insert(descriptor.name.clone(), self.tools.len());
        self.tools.push(descriptor);
        Ok(())
    }

    /// Look up a visible tool.
    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        if self.ignored.contains(name) {
            return None;
        }
        self.index.get(name).map(|&i| &self.tools[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Visible descriptors in registration order.
    pub fn list(&self) -> Vec<&ToolDescriptor> {
        self.tools
            .iter()
            .filter(|t| !self.ignored.contains(&t.name))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.list().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Validate arguments for `tool_name`. Pure: never touches the network.
    pub fn validate(
        &self,
        tool_name: &str,
        arguments: &serde_json::Value,
    ) -> Result<ValidatedArguments> {
        let descriptor = self
            .get(tool_name)
            .ok_or_else(|| Error::UnknownTool(tool_name.to_string()))?;
        self.validator
            .validate(&descriptor.fields, arguments)
            .map_err(|errors| {
                Error::validation(format!("invalid arguments for {}", tool_name), errors)
            })
    }
}
