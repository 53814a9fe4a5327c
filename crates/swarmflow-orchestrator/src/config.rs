use serde::{Deserialize, Serialize};

/// Tunables for the orchestration engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Maximum number of subtasks executing concurrently.
    pub max_parallel: usize,
    /// When set, compliance rejections park the subtask for human review
    /// instead of failing it.
    pub human_in_loop: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_parallel: 5,
            human_in_loop: true,
        }
    }
}

impl OrchestratorConfig {
    /// Set the concurrency limit. Chainable builder method.
    pub fn with_max_parallel(mut self, max_parallel: usize) -> Self {
        self.max_parallel = max_parallel;
        self
    }

    /// Enable or disable human-in-the-loop review. Chainable builder
    /// method.
    pub fn with_human_in_loop(mut self, human_in_loop: bool) -> Self {
        self.human_in_loop = human_in_loop;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.max_parallel, 5);
        assert!(config.human_in_loop);
    }

    #[test]
    fn test_builder() {
        let config = OrchestratorConfig::default()
            .with_max_parallel(2)
            .with_human_in_loop(false);
        assert_eq!(config.max_parallel, 2);
        assert!(!config.human_in_loop);
    }
}
