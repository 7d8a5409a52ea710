pub mod campaign;
pub mod config;
pub mod media;
pub mod metrics;
pub mod platform;
pub mod report;
pub mod retry;
pub mod saga;
pub mod scheduler;
pub mod testing;
pub mod thumbnail;
pub mod uploader;

pub use campaign::{
    CampaignSpec, PlatformTarget, RowSchema, SourceRow, TaskPlanner, TaskStatus, UploadResult,
    UploadTask,
};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, NotifierConfig,
    PlatformConfig, SanitizedConfig,
};
pub use platform::{AdsPlatform, GraphApiClient, PlatformError};
pub use retry::{OperationClass, RetryExecutor, RetryPolicy, RetryPolicyTable};
pub use saga::{SagaReport, SagaRunner, SagaState};
pub use scheduler::{run_pool, TaskRunner};
pub use uploader::{upload, BatchReport, BatchUploader};
