mod load;
mod types;

pub use load::{
    apply_env_overrides, get_packetflow_data_dir, load_default, load_from, LOCAL_CONFIG_FILE,
};
pub use types::{
    AppConfig, CommandsConfig, ExecutorConfig, KnowledgeConfig, LoggingConfig, MergeConfig,
    RetryConfig, SchedulerConfig, StateConfig, DEFAULT_STATE_DIR_NAME,
};
