//! Executor configuration.

use serde::{Deserialize, Serialize};

/// Failure policy of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExecutorConfig {
    /// Keep going after a failed step instead of aborting the run.
    ///
    /// Steps whose `dependsOn` prerequisites failed or were skipped are
    /// recorded as skipped rather than invoked.
    pub continue_on_error: bool,
}

impl ExecutorConfig {
    /// Configuration that continues past failed steps.
    pub fn continue_on_error() -> Self {
        Self {
            continue_on_error: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_halts() {
        assert!(!ExecutorConfig::default().continue_on_error);
    }

    #[test]
    fn test_from_json() {
        let config: ExecutorConfig = serde_json::from_str(r#"{"continueOnError": true}"#).unwrap();
        assert_eq!(config, ExecutorConfig::continue_on_error());

        let config: ExecutorConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, ExecutorConfig::default());
    }
}
