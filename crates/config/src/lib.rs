// Configuration loading

pub mod job;

pub use job::{
    Authorization, ConfigError, HeaderConfig, JobConfig, OAuthCredentials, Parameters,
    SheetDescriptor, TokenData,
};
