//! ServicesFactory implementation: builds every collaborator from config so
//! the CLI wires them in one place.
use async_trait::async_trait;
use packetflow_core::api::{AppConfig, Manifest, RunSettings, Services, ServicesFactory};

use crate::factory;

#[derive(Debug, Default)]
pub struct PluginServicesFactory;

#[async_trait]
impl ServicesFactory for PluginServicesFactory {
    async fn build_services(
        &self,
        cfg: &AppConfig,
        manifest: &Manifest,
        settings: &RunSettings,
    ) -> anyhow::Result<Services> {
        Ok(Services {
            task_executor: factory::build_task_executor(cfg),
            workspace: factory::build_workspace(),
            integrator: factory::build_integrator(cfg, manifest),
            gates: factory::build_gates(cfg, manifest),
            decisions: factory::build_decisions(cfg, settings),
            knowledge: factory::build_knowledge(cfg, manifest),
            retry: factory::build_retry(cfg),
            renderer: factory::build_renderer(&settings.format),
        })
    }
}
