//! Agent definitions.
//!
//! Agents are described once, up front, as an ordered YAML list:
//!
//! ```yaml
//! agents:
//!   - name: opencode
//!     command: "opencode run --dir {workspace} --format json"
//!     prompt_via: stdin
//!
//!   - name: codex
//!     command: "codex exec --sandbox workspace-write --json"
//!     prompt_via: trailing-argument
//!     environment:
//!       RUST_LOG: "warn"
//!     unset_env:
//!       - OPENAI_LOG
//! ```
//!
//! `command` is split with shell quoting rules; its first word is the
//! executable looked up on `PATH`, the remaining words are argument
//! templates (see [`super::template`]).

use super::template::ArgTemplate;
use crate::error::{Result, VerifyError};
use crate::workspace::sanitize_component;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Environment variables that make an agent CLI believe it is already
/// running under a supervising session.
pub const NESTING_MARKERS: &[&str] = &["CLAUDECODE", "CLAUDE_CODE_ENTRYPOINT"];

const BUILTIN_AGENTS_YAML: &str = r#"
agents:
  - name: opencode
    command: "opencode run --model opencode/minimax-m2.5-free --dir {workspace} --format json"
    prompt_via: stdin
  - name: codex
    command: "codex exec --sandbox workspace-write --json"
    prompt_via: trailing-argument
  - name: claude
    command: "claude -p --output-format json --permission-mode bypassPermissions"
    prompt_via: trailing-argument
"#;

/// How the prompt text reaches the agent process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PromptDelivery {
    /// Written to the child's standard input, which is then closed.
    Stdin,
    /// Appended as the final command-line argument.
    #[serde(alias = "arg")]
    TrailingArgument,
}

/// Immutable description of one agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentSpec {
    pub name: String,
    /// Executable name (or path) resolved against `PATH` at launch.
    pub executable: String,
    pub args: Vec<ArgTemplate>,
    pub prompt_via: PromptDelivery,
    /// Extra variables set in the agent's environment.
    pub environment: BTreeMap<String, String>,
    /// Variables removed in addition to [`NESTING_MARKERS`].
    pub unset_env: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct AgentEntry {
    name: String,
    command: String,
    prompt_via: PromptDelivery,
    #[serde(default)]
    environment: BTreeMap<String, String>,
    #[serde(default)]
    unset_env: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct AgentsFile {
    #[serde(default)]
    agents: Vec<AgentEntry>,
}

impl AgentEntry {
    fn into_spec(self) -> Result<AgentSpec> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(VerifyError::ConfigError("agent name is empty".to_string()));
        }

        let words = shell_words::split(&self.command).map_err(|e| {
            VerifyError::ConfigError(format!(
                "agent '{}': failed to parse command '{}': {}",
                name, self.command, e
            ))
        })?;

        let mut words = words.into_iter();
        let executable = words.next().filter(|w| !w.is_empty()).ok_or_else(|| {
            VerifyError::ConfigError(format!("agent '{}': command is empty", name))
        })?;

        let args = words
            .map(|w| {
                ArgTemplate::parse(&w).map_err(|e| {
                    VerifyError::ConfigError(format!(
                        "agent '{}': argument '{}': {}",
                        name, w, e
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(AgentSpec {
            name,
            executable,
            args,
            prompt_via: self.prompt_via,
            environment: self.environment,
            unset_env: self.unset_env,
        })
    }
}

/// The ordered, immutable list of agents a run supervises.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentsConfig {
    agents: Vec<AgentSpec>,
}

impl AgentsConfig {
    /// The stock agent set: opencode, codex and claude.
    pub fn builtin() -> Result<Self> {
        Self::from_yaml(BUILTIN_AGENTS_YAML)
    }

    /// Load agents from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            VerifyError::UserError(format!(
                "failed to read agents config '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_yaml(&content)
    }

    /// Parse and validate agents from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let file: AgentsFile = serde_yaml::from_str(yaml)
            .map_err(|e| VerifyError::ConfigError(format!("failed to parse agents: {}", e)))?;

        let agents = file
            .agents
            .into_iter()
            .map(AgentEntry::into_spec)
            .collect::<Result<Vec<_>>>()?;

        Self::new(agents)
    }

    /// Build a config from already-constructed specs, enforcing unique names.
    pub fn new(agents: Vec<AgentSpec>) -> Result<Self> {
        let mut seen = BTreeSet::new();
        let mut slugs = BTreeMap::new();
        for agent in &agents {
            if !seen.insert(agent.name.as_str()) {
                return Err(VerifyError::ConfigError(format!(
                    "duplicate agent name '{}'",
                    agent.name
                )));
            }
            // Workspace and log paths are keyed by the sanitized name.
            if let Some(other) = slugs.insert(sanitize_component(&agent.name), agent.name.as_str()) {
                return Err(VerifyError::ConfigError(format!(
                    "agent names '{}' and '{}' map to the same workspace path",
                    other, agent.name
                )));
            }
        }
        Ok(Self { agents })
    }

    /// Keep only the named agents, preserving configuration order.
    ///
    /// An empty selection keeps everything.
    pub fn select(self, names: &[String]) -> Result<Self> {
        if names.is_empty() {
            return Ok(self);
        }
        if let Some(unknown) = names.iter().find(|n| self.get(n).is_none()) {
            return Err(VerifyError::UserError(format!(
                "unknown agent '{}'. Configured agents: {}",
                unknown,
                self.names().collect::<Vec<_>>().join(", ")
            )));
        }
        let agents = self
            .agents
            .into_iter()
            .filter(|a| names.contains(&a.name))
            .collect();
        Ok(Self { agents })
    }

    pub fn get(&self, name: &str) -> Option<&AgentSpec> {
        self.agents.iter().find(|a| a.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.agents.iter().map(|a| a.name.as_str())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AgentSpec> {
        self.agents.iter()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

impl IntoIterator for AgentsConfig {
    type Item = AgentSpec;
    type IntoIter = std::vec::IntoIter<AgentSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.agents.into_iter()
    }
}

impl<'a> IntoIterator for &'a AgentsConfig {
    type Item = &'a AgentSpec;
    type IntoIter = std::slice::Iter<'a, AgentSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::template::Placeholder;
    use crate::test_support::sh_agent;

    #[test]
    fn test_builtin_agents() {
        let config = AgentsConfig::builtin().unwrap();
        let names: Vec<_> = config.names().collect();
        assert_eq!(names, vec!["opencode", "codex", "claude"]);

        let opencode = config.get("opencode").unwrap();
        assert_eq!(opencode.executable, "opencode");
        assert_eq!(opencode.prompt_via, PromptDelivery::Stdin);
        assert!(
            opencode
                .args
                .iter()
                .any(|a| a.placeholders().any(|p| p == Placeholder::Workspace))
        );

        let codex = config.get("codex").unwrap();
        assert_eq!(codex.prompt_via, PromptDelivery::TrailingArgument);
        assert_eq!(codex.args[0].as_str(), "exec");
    }

    #[test]
    fn test_parse_full_entry() {
        let yaml = r#"
agents:
  - name: custom
    command: "sh -c 'echo \"hi there\"' --"
    prompt_via: arg
    environment:
      FOO: bar
    unset_env: [SECRET]
"#;
        let config = AgentsConfig::from_yaml(yaml).unwrap();
        let agent = config.get("custom").unwrap();
        assert_eq!(agent.executable, "sh");
        let args: Vec<_> = agent.args.iter().map(|a| a.as_str()).collect();
        assert_eq!(args, vec!["-c", "echo \"hi there\"", "--"]);
        assert_eq!(agent.prompt_via, PromptDelivery::TrailingArgument);
        assert_eq!(agent.environment.get("FOO").map(String::as_str), Some("bar"));
        assert_eq!(agent.unset_env, vec!["SECRET"]);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let yaml = r#"
agents:
  - name: a
    command: "true"
    prompt_via: stdin
  - name: a
    command: "false"
    prompt_via: stdin
"#;
        let err = AgentsConfig::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, VerifyError::ConfigError(_)));
        assert!(err.to_string().contains("duplicate agent name 'a'"));
    }

    #[test]
    fn test_names_colliding_after_sanitizing_rejected() {
        let err = AgentsConfig::new(vec![
            sh_agent("My Agent", "true", PromptDelivery::Stdin),
            sh_agent("my-agent", "true", PromptDelivery::Stdin),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("same workspace path"));
    }

    #[test]
    fn test_empty_command_rejected() {
        let yaml = "agents:\n  - name: a\n    command: \"\"\n    prompt_via: stdin\n";
        let err = AgentsConfig::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("command is empty"));
    }

    #[test]
    fn test_unknown_placeholder_rejected() {
        let yaml = "agents:\n  - name: a\n    command: \"tool {model}\"\n    prompt_via: stdin\n";
        let err = AgentsConfig::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("unknown placeholder '{model}'"));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let yaml = "agents:\n  - name: a\n    command: tool\n    prompt_via: stdin\n    timeout: 3\n";
        assert!(AgentsConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_unknown_prompt_delivery_rejected() {
        let yaml = "agents:\n  - name: a\n    command: tool\n    prompt_via: carrier-pigeon\n";
        assert!(AgentsConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_select_preserves_order() {
        let config = AgentsConfig::builtin().unwrap();
        let selected = config
            .select(&["claude".to_string(), "opencode".to_string()])
            .unwrap();
        let names: Vec<_> = selected.names().collect();
        assert_eq!(names, vec!["opencode", "claude"]);
    }

    #[test]
    fn test_select_unknown_agent() {
        let config = AgentsConfig::builtin().unwrap();
        let err = config.select(&["gemini".to_string()]).unwrap_err();
        assert!(matches!(err, VerifyError::UserError(_)));
        assert!(err.to_string().contains("unknown agent 'gemini'"));
    }

    #[test]
    fn test_select_empty_keeps_all() {
        let config = AgentsConfig::builtin().unwrap();
        assert_eq!(config.clone().select(&[]).unwrap(), config);
    }

    #[test]
    fn test_load_missing_file() {
        let err = AgentsConfig::load("/nonexistent/agents.yaml").unwrap_err();
        assert!(err.to_string().contains("failed to read agents config"));
    }
}
