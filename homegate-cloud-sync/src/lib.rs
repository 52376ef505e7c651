pub mod aws_shadow;
pub mod config;
pub mod dispatcher;
pub mod health;
pub mod poller;
pub mod proprietary;

pub use aws_shadow::AwsShadowClient;
pub use config::CloudSyncConfig;
pub use dispatcher::CloudSyncDispatcher;
pub use health::CloudReachability;
pub use poller::AwsShadowPoller;
pub use proprietary::ProprietaryCloudClient;
