#![doc = include_str!("../README.md")]

pub mod config;
pub mod environment;
pub mod error;
pub mod metrics;
pub mod types;

// --- 주요 타입 re-export ---

// 에러
pub use error::{ConfigError, ProcessingError, StreamAlertError};

// 설정
pub use config::{
    FieldType, GeneralConfig, LogDefinition, ParserKind, SourceEntity, StreamAlertConfig,
};

// 실행 환경
pub use environment::{EnvironmentDescriptor, InvocationContext, Stage};

// 도메인 타입
pub use types::{Alert, Severity};
