//! Console configuration.

use crate::script::DEFAULT_NAMESPACES;

/// Settings applied when a [`Console`](crate::Console) is constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleConfig {
    /// Maximum number of output lines kept; `None` keeps everything.
    pub max_output_lines: Option<usize>,
    /// Maximum number of commands kept in command history; `None` keeps everything.
    pub max_command_history: Option<usize>,
    /// Snippet namespaces enabled at startup.
    pub namespaces: Vec<String>,
    /// When false, lines that match no command fail instead of being compiled.
    pub fallback: bool,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            max_output_lines: None,
            max_command_history: None,
            namespaces: DEFAULT_NAMESPACES.iter().map(|ns| ns.to_string()).collect(),
            fallback: true,
        }
    }
}

impl ConsoleConfig {
    pub fn max_output_lines(mut self, lines: usize) -> Self {
        self.max_output_lines = Some(lines);
        self
    }

    pub fn max_command_history(mut self, commands: usize) -> Self {
        self.max_command_history = Some(commands);
        self
    }

    pub fn namespaces<I, S>(mut self, namespaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.namespaces = namespaces.into_iter().map(Into::into).collect();
        self
    }

    pub fn fallback(mut self, enabled: bool) -> Self {
        self.fallback = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_unbounded_with_all_namespaces() {
        let config = ConsoleConfig::default();
        assert_eq!(config.max_output_lines, None);
        assert_eq!(config.max_command_history, None);
        assert_eq!(config.namespaces, vec!["core", "math", "text"]);
        assert!(config.fallback);
    }

    #[test]
    fn test_builder_setters() {
        let config = ConsoleConfig::default()
            .max_output_lines(50)
            .max_command_history(25)
            .namespaces(["core"])
            .fallback(false);
        assert_eq!(config.max_output_lines, Some(50));
        assert_eq!(config.max_command_history, Some(25));
        assert_eq!(config.namespaces, vec!["core"]);
        assert!(!config.fallback);
    }
}
