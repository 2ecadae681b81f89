//! Tool manager for registering and executing tools

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use crate::llm::ToolDefinition;
use crate::tool::{Tool, ToolDeclaration, ToolResult};
use crate::{Error, Result};

/// Registry of tools indexed by name
///
/// Cloning is cheap; clones share the registered tools.
#[derive(Clone)]
pub struct ToolManager {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolManager {
    /// Create a new empty tool manager
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool
    ///
    /// If a tool with the same name already exists, it will be replaced.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        debug!(tool = %name, "Registering tool");
        if self.tools.insert(name.clone(), tool).is_some() {
            warn!(tool = %name, "Replaced a tool with the same name");
        }
    }

    /// Register a tool unless its name is taken.
    ///
    /// Returns `false` and keeps the existing tool on a name collision.
    pub fn try_register(&mut self, tool: Arc<dyn Tool>) -> bool {
        if self.tools.contains_key(tool.name()) {
            return false;
        }
        self.register(tool);
        true
    }

    /// Unregister a tool by name
    pub fn remove(&mut self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.remove(name)
    }

    /// Builder-style registration
    pub fn with(mut self, tool: Arc<dyn Tool>) -> Self {
        self.register(tool);
        self
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Declarations of all registered tools, sorted by name
    pub fn declarations(&self) -> Vec<ToolDeclaration> {
        let mut declarations: Vec<_> = self
            .tools
            .values()
            .map(|t| ToolDeclaration::of(t.as_ref()))
            .collect();
        declarations.sort_by(|a, b| a.name.cmp(&b.name));
        declarations
    }

    /// Tool definitions for the model, sorted by name
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.declarations()
            .iter()
            .map(ToolDeclaration::to_definition)
            .collect()
    }

    /// Execute a tool by name
    ///
    /// # Errors
    /// Returns [`Error::UnknownTool`] if the tool is not registered, or the
    /// tool's own error if execution fails
    pub async fn execute(&self, name: &str, input: JsonValue) -> Result<ToolResult> {
        let tool = self
            .get(name)
            .ok_or_else(|| Error::UnknownTool(name.to_string()))?;
        tool.execute(input).await
    }

    /// Check if a tool is registered
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Get the number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if no tools are registered
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// All registered tool names, sorted
    pub fn tool_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

impl Default for ToolManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;

    struct Echo(&'static str);

    #[async_trait]
    impl Tool for Echo {
        fn name(&self) -> &str {
            self.0
        }

        fn description(&self) -> &str {
            "Echoes its input"
        }

        fn input_schema(&self) -> JsonValue {
            json!({"type": "object"})
        }

        async fn execute(&self, input: JsonValue) -> Result<ToolResult> {
            Ok(ToolResult::success(input.to_string()))
        }
    }

    #[tokio::test]
    async fn test_execute_registered_tool() {
        let manager = ToolManager::new().with(Arc::new(Echo("echo")));
        let result = manager.execute("echo", json!({"a": 1})).await.unwrap();
        assert_eq!(result, ToolResult::success(r#"{"a":1}"#));
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let manager = ToolManager::new();
        let err = manager.execute("missing", json!({})).await.unwrap_err();
        assert!(matches!(err, Error::UnknownTool(name) if name == "missing"));
    }

    #[tokio::test]
    async fn test_try_register_keeps_first() {
        struct Fixed(&'static str);

        #[async_trait]
        impl Tool for Fixed {
            fn name(&self) -> &str {
                "ask_question"
            }
            fn description(&self) -> &str {
                "Answers from one server"
            }
            fn input_schema(&self) -> JsonValue {
                json!({"type": "object"})
            }
            async fn execute(&self, _input: JsonValue) -> Result<ToolResult> {
                Ok(ToolResult::success(self.0))
            }
        }

        let mut manager = ToolManager::new();
        assert!(manager.try_register(Arc::new(Fixed("first"))));
        assert!(!manager.try_register(Arc::new(Fixed("second"))));
        assert_eq!(manager.len(), 1);

        let result = manager.execute("ask_question", json!({})).await.unwrap();
        assert_eq!(result.output, "first");

        assert!(manager.remove("ask_question").is_some());
        assert!(manager.is_empty());
    }

    #[test]
    fn test_definitions_sorted() {
        let manager = ToolManager::new()
            .with(Arc::new(Echo("zeta")))
            .with(Arc::new(Echo("alpha")));
        let names: Vec<_> = manager.definitions().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
        assert_eq!(manager.tool_names(), vec!["alpha", "zeta"]);
        assert!(manager.declarations()[0].output_schema.is_none());
    }
}
