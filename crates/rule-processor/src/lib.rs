#![doc = include_str!("../README.md")]
//!
//! # 모듈 구성
//!
//! - [`handler`]: 호출 단위 디스패처 ([`StreamAlert`]) 및 전달 결정
//! - [`classifier`]: 소스 판별(분류 게이트) 및 로그 타입 분류
//! - [`pre_parsers`]: 서비스별 데이터 추출 (kinesis, s3, sns)
//! - [`parser`]: 로그 형식별 파서 (json, kv, csv) 및 스키마 검사
//! - [`rule`]: YAML 기반 탐지 규칙 엔진
//! - [`sink`]: 운영 단계 알림 전달
//! - [`object_store`]: 아카이브 객체 조회 추상화
//! - [`payload`]: 파이프라인을 흐르는 데이터 단위
//! - [`logging`]: 호출 단위 로깅 설정
//! - [`error`]: 도메인 에러 타입

pub mod classifier;
pub mod error;
pub mod handler;
pub mod logging;
pub mod object_store;
pub mod parser;
pub mod payload;
pub mod pre_parsers;
pub mod rule;
pub mod sink;

// --- 주요 타입 re-export ---

// 디스패처
pub use handler::{
    DeliveryOutcome, InvocationReport, InvocationStats, RunOutcome, StreamAlert,
    StreamAlertBuilder,
};

// 에러
pub use error::RuleProcessorError;

// 분류 / 추출
pub use classifier::StreamClassifier;
pub use payload::{Payload, Record, ServiceKind};
pub use pre_parsers::PreParsers;

// 파서
pub use parser::{CsvLogParser, JsonLogParser, KvLogParser, LogParser};

// 규칙 엔진
pub use rule::{DetectionRule, RuleEngine, RuleLoader};

// 객체 저장소 / 싱크
pub use object_store::{FsObjectStore, ObjectStore};
pub use sink::{AlertBatch, AlertSink, ChannelSink, JsonLinesSink};

// 로깅
pub use logging::{LogFormat, LogSettings};
