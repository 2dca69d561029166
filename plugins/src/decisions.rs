use async_trait::async_trait;

use packetflow_core::api::{Decision, DecisionHandler, DecisionRequest, DependencyTimeoutPolicy};

/// Answers dependency timeouts from the command line policy and leaves merge
/// escalations to the operator, which suspends the merge.
pub struct PresetDecisionHandler {
    on_dependency_timeout: DependencyTimeoutPolicy,
    max_wait_extensions: u32,
}

impl PresetDecisionHandler {
    pub fn new(on_dependency_timeout: DependencyTimeoutPolicy, max_wait_extensions: u32) -> Self {
        Self {
            on_dependency_timeout,
            max_wait_extensions,
        }
    }
}

#[async_trait]
impl DecisionHandler for PresetDecisionHandler {
    fn name(&self) -> &str {
        "preset"
    }

    async fn decide(&self, request: &DecisionRequest) -> Option<Decision> {
        match request {
            DecisionRequest::DependencyTimeout { extensions, .. } => {
                match self.on_dependency_timeout {
                    DependencyTimeoutPolicy::Wait if *extensions < self.max_wait_extensions => {
                        Some(Decision::Wait)
                    }
                    _ => Some(Decision::Abort),
                }
            }
            DecisionRequest::MergeConflict { .. } | DecisionRequest::RoundTestFailure { .. } => {
                None
            }
        }
    }
}
