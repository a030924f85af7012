//! Built-in tool registry and the tool set handed to the controller.

use super::builtin::{
    CommandExecution, DirectoryCreation, Environment, FileAppending, FileCreation, FileDeletion,
    FileReading, Stats, SystemInfo,
};
use super::definitions::{FunctionDefinition, ToolProvider, ToolSpec};
use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Name prefix of every built-in tool.
///
/// Keeps built-ins apart from externally supplied tools.
pub const BUILTIN_PREFIX: &str = "__";

/// Configuration slots of all built-in tools.
///
/// Adding a tool means adding a field here and an entry in
/// [`BuiltIns::providers`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct BuiltIns {
    /// System information tool.
    #[serde(rename = "systeminfo")]
    pub system_info: SystemInfo,
    /// Environment variables tool.
    pub environment: Environment,
    /// File creation tool.
    pub file_creation: FileCreation,
    /// File appending tool.
    pub file_appending: FileAppending,
    /// File reading tool.
    pub file_reading: FileReading,
    /// File deletion tool.
    pub file_deletion: FileDeletion,
    /// Directory creation tool.
    pub directory_creation: DirectoryCreation,
    /// File stats tool.
    pub stats: Stats,
    /// Command execution tool.
    pub command_execution: CommandExecution,
}

impl BuiltIns {
    /// Returns every slot as a provider, in declaration order.
    #[must_use]
    pub fn providers(&self) -> [&dyn ToolProvider; 9] {
        [
            &self.system_info,
            &self.environment,
            &self.file_creation,
            &self.file_appending,
            &self.file_reading,
            &self.file_deletion,
            &self.directory_creation,
            &self.stats,
            &self.command_execution,
        ]
    }

    /// Yields the definitions of all enabled built-ins, prefixed with
    /// [`BUILTIN_PREFIX`].
    ///
    /// Recomputed on every call; the registry itself is never modified.
    pub fn as_function_definitions(&self) -> impl Iterator<Item = FunctionDefinition> + '_ {
        self.providers()
            .into_iter()
            .filter_map(ToolProvider::as_function_definition)
            .map(|mut def| {
                def.name = format!("{BUILTIN_PREFIX}{}", def.name);
                def
            })
    }

    /// Projects the enabled built-ins into a tool set.
    pub fn tool_set(&self) -> Result<ToolSet, ConfigError> {
        ToolSet::new(self.as_function_definitions())
    }
}

/// The ordered, name-indexed set of tools exposed to one model session.
#[derive(Debug, Clone, Default)]
pub struct ToolSet {
    definitions: Vec<FunctionDefinition>,
    index: HashMap<String, usize>,
}

impl ToolSet {
    /// Builds a tool set, rejecting duplicate names.
    pub fn new(definitions: impl IntoIterator<Item = FunctionDefinition>) -> Result<Self, ConfigError> {
        let mut set = Self::default();
        set.extend(definitions)?;
        Ok(set)
    }

    /// Adds definitions, e.g. externally supplied tools, rejecting duplicate names.
    pub fn extend(
        &mut self,
        definitions: impl IntoIterator<Item = FunctionDefinition>,
    ) -> Result<(), ConfigError> {
        for def in definitions {
            if self.index.contains_key(&def.name) {
                return Err(ConfigError::DuplicateTool(def.name));
            }
            self.index.insert(def.name.clone(), self.definitions.len());
            self.definitions.push(def);
        }
        Ok(())
    }

    /// Looks up a definition by exact name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FunctionDefinition> {
        self.index.get(name).map(|&i| &self.definitions[i])
    }

    /// Returns the model-facing specs in order.
    #[must_use]
    pub fn specs(&self) -> Vec<ToolSpec> {
        self.definitions.iter().map(FunctionDefinition::spec).collect()
    }

    /// Returns the tool names in order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.definitions.iter().map(|d| d.name.as_str()).collect()
    }

    /// Iterates over the definitions in order.
    pub fn iter(&self) -> impl Iterator<Item = &FunctionDefinition> {
        self.definitions.iter()
    }

    /// Returns the number of tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Returns true if there are no tools.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingCommand;
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;
    use std::sync::Arc;

    fn all_disabled() -> BuiltIns {
        let mut builtins = BuiltIns::default();
        builtins.system_info.disable = true;
        builtins.environment.disable = true;
        builtins.file_creation.disable = true;
        builtins.file_appending.disable = true;
        builtins.file_reading.disable = true;
        builtins.file_deletion.disable = true;
        builtins.directory_creation.disable = true;
        builtins.stats.disable = true;
        builtins.command_execution.disable = true;
        builtins
    }

    #[test]
    fn test_default_exposes_every_builtin() {
        let builtins = BuiltIns::default();
        let names: Vec<String> = builtins.as_function_definitions().map(|d| d.name).collect();

        assert_eq!(
            names,
            vec![
                "__getSystemInformation",
                "__getEnvironment",
                "__createFile",
                "__appendFile",
                "__readTextFile",
                "__deleteFile",
                "__createDirectory",
                "__getStats",
                "__executeCommand",
            ]
        );
    }

    #[test]
    fn test_names_are_prefixed_and_unique() {
        let builtins = BuiltIns::default();
        let names: Vec<String> = builtins.as_function_definitions().map(|d| d.name).collect();
        let unique: HashSet<&String> = names.iter().collect();

        assert!(names.iter().all(|n| n.starts_with(BUILTIN_PREFIX)));
        assert_eq!(unique.len(), names.len());
    }

    #[test]
    fn test_disabled_slots_contribute_nothing() {
        assert_eq!(all_disabled().as_function_definitions().count(), 0);

        let mut builtins = all_disabled();
        builtins.file_creation.disable = false;
        let defs: Vec<FunctionDefinition> = builtins.as_function_definitions().collect();

        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].name, "__createFile");
    }

    #[test]
    fn test_each_slot_toggles_exactly_one_definition() {
        let total = BuiltIns::default().as_function_definitions().count();
        let slots = BuiltIns::default().providers().len();
        assert_eq!(total, slots);

        for (i, provider) in BuiltIns::default().providers().iter().enumerate() {
            assert!(provider.as_function_definition().is_some(), "slot {i} should be enabled");
        }
    }

    #[test]
    fn test_projection_follows_configuration_changes() {
        let mut builtins = BuiltIns::default();
        let before = builtins.as_function_definitions().count();

        builtins.command_execution.disable = true;
        let after = builtins.as_function_definitions().count();

        assert_eq!(after, before - 1);
    }

    #[test]
    fn test_approval_flag_is_carried() {
        let mut builtins = all_disabled();
        builtins.file_creation.disable = false;
        builtins.file_creation.needs_approval = true;

        let def = builtins.as_function_definitions().next().unwrap();
        assert!(def.needs_approval);
    }

    #[test]
    fn test_config_ignores_unknown_keys() {
        let builtins: BuiltIns = serde_json::from_value(serde_json::json!({
            "file-creation": {"disable": true, "approval": true, "color": "blue"},
            "unknown-tool": {"disable": false}
        }))
        .unwrap();

        assert!(builtins.file_creation.disable);
        assert!(builtins.file_creation.needs_approval);
        assert!(!builtins.system_info.disable);
    }

    #[test]
    fn test_system_info_key_is_unhyphenated() {
        let builtins: BuiltIns = serde_json::from_value(serde_json::json!({
            "systeminfo": {"disable": true},
            "command-execution": {"approval": false}
        }))
        .unwrap();

        assert!(builtins.system_info.disable);
        assert!(!builtins.command_execution.needs_approval);
        assert!(builtins.tool_set().unwrap().get("__getSystemInformation").is_none());

        let encoded = serde_json::to_value(&builtins).unwrap();
        assert!(encoded.get("systeminfo").is_some());
        assert!(encoded.get("system-info").is_none());
    }

    #[test]
    fn test_tool_set_lookup() {
        let set = BuiltIns::default().tool_set().unwrap();

        assert!(set.get("__createFile").is_some());
        assert!(set.get("createFile").is_none());
        assert_eq!(set.specs().len(), set.len());
    }

    #[test]
    fn test_tool_set_rejects_duplicates() {
        let mut set = BuiltIns::default().tool_set().unwrap();
        let external = FunctionDefinition::new("__createFile", Arc::new(RecordingCommand::ok("{}")));

        let err = set.extend([external]).unwrap_err();
        assert_eq!(err, ConfigError::DuplicateTool("__createFile".to_string()));
    }

    #[test]
    fn test_tool_set_accepts_external_tools() {
        let mut set = BuiltIns::default().tool_set().unwrap();
        let before = set.len();

        set.extend([FunctionDefinition::new("weather", Arc::new(RecordingCommand::ok("{}")))])
            .unwrap();

        assert_eq!(set.len(), before + 1);
        assert_eq!(set.names().last(), Some(&"weather"));
    }
}
