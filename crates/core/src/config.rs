//! 설정 관리 -- streamalert.toml 파싱 및 런타임 설정
//!
//! [`StreamAlertConfig`]는 룰 프로세서가 한 번의 호출 동안 참조하는 불변 설정입니다.
//! 소스(서비스/엔티티)별로 허용되는 로그 타입과, 로그 타입별 파서/스키마를 담습니다.
//!
//! # 설정 로딩 우선순위
//! 1. 환경변수 (`STREAMALERT_GENERAL_LOG_LEVEL=debug` 형식)
//! 2. 설정 파일 (`streamalert.toml`)
//! 3. 기본값 (`Default` 구현)
//!
//! # 설정 예시
//! ```toml
//! [general]
//! log_level = "info"
//! rule_dir = "/etc/streamalert/rules"
//!
//! [sources.kinesis.prod_stream]
//! logs = ["osquery"]
//!
//! [sources.s3.prod-cloudtrail]
//! logs = ["cloudtrail"]
//!
//! [logs.osquery]
//! parser = "json"
//!
//! [logs.osquery.schema]
//! name = "string"
//! hostIdentifier = "string"
//!
//! [logs.cloudtrail]
//! parser = "json"
//! envelope_key = "Records"
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, StreamAlertError};

/// StreamAlert 통합 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreamAlertConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 서비스명 -> (엔티티명 -> 엔티티 설정)
    ///
    /// 서비스명은 `kinesis`, `s3`, `sns` 또는 기타 전송 계층 이름입니다.
    #[serde(default)]
    pub sources: BTreeMap<String, BTreeMap<String, SourceEntity>>,
    /// 로그 타입명 -> 로그 정의
    #[serde(default)]
    pub logs: BTreeMap<String, LogDefinition>,
}

impl StreamAlertConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용한 뒤 검증합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, StreamAlertError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, StreamAlertError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StreamAlertError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                StreamAlertError::Io(e)
            }
        })?;
        Self::parse(&content)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, StreamAlertError> {
        toml::from_str(toml_str).map_err(|e| {
            StreamAlertError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 일반 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `STREAMALERT_GENERAL_{FIELD}`
    pub fn apply_env_overrides(&mut self) {
        override_string(&mut self.general.log_level, "STREAMALERT_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "STREAMALERT_GENERAL_LOG_FORMAT");
        override_string(&mut self.general.rule_dir, "STREAMALERT_GENERAL_RULE_DIR");
        override_string(
            &mut self.general.object_store_root,
            "STREAMALERT_GENERAL_OBJECT_STORE_ROOT",
        );
        override_usize(
            &mut self.general.max_object_size,
            "STREAMALERT_GENERAL_MAX_OBJECT_SIZE",
        );
        override_string(
            &mut self.general.alert_output,
            "STREAMALERT_GENERAL_ALERT_OUTPUT",
        );
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), StreamAlertError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        if self.general.max_object_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "general.max_object_size".to_owned(),
                reason: "must be greater than 0".to_owned(),
            }
            .into());
        }

        // 소스가 참조하는 로그 타입은 모두 정의되어 있어야 함
        for (service, entities) in &self.sources {
            for (entity, source) in entities {
                if source.logs.is_empty() {
                    return Err(ConfigError::InvalidValue {
                        field: format!("sources.{service}.{entity}.logs"),
                        reason: "at least one log type is required".to_owned(),
                    }
                    .into());
                }
                for log in &source.logs {
                    if !self.logs.contains_key(log) {
                        return Err(ConfigError::InvalidValue {
                            field: format!("sources.{service}.{entity}.logs"),
                            reason: format!("undefined log type '{log}'"),
                        }
                        .into());
                    }
                }
            }
        }

        for (name, log) in &self.logs {
            if log.parser == ParserKind::Csv && log.columns.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: format!("logs.{name}.columns"),
                    reason: "csv parser requires column names".to_owned(),
                }
                .into());
            }
        }

        Ok(())
    }

    /// 서비스/엔티티에 해당하는 소스 설정을 조회합니다.
    pub fn source_entity(&self, service: &str, entity: &str) -> Option<&SourceEntity> {
        self.sources.get(service)?.get(entity)
    }

    /// 로그 타입 정의를 조회합니다.
    pub fn log_definition(&self, name: &str) -> Option<&LogDefinition> {
        self.logs.get(name)
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
    /// 탐지 규칙 디렉토리
    pub rule_dir: String,
    /// 아카이브 객체 저장소 루트 (`<root>/<bucket>/<key>`)
    pub object_store_root: String,
    /// 아카이브 객체 최대 크기 (바이트, 압축 해제 후)
    pub max_object_size: usize,
    /// 알림 출력 파일 (JSON lines)
    pub alert_output: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
            rule_dir: "/etc/streamalert/rules".to_owned(),
            object_store_root: "/var/lib/streamalert/objects".to_owned(),
            max_object_size: 128 * 1024 * 1024, // 128MB
            alert_output: "/var/lib/streamalert/alerts.jsonl".to_owned(),
        }
    }
}

/// 엔티티(스트림/버킷/토픽) 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceEntity {
    /// 이 엔티티에서 허용되는 로그 타입 (분류 시 순서대로 시도)
    #[serde(default)]
    pub logs: Vec<String>,
}

/// 로그 타입 정의
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogDefinition {
    /// 파서 종류
    pub parser: ParserKind,
    /// 필수 필드 스키마 (필드명 -> 타입)
    #[serde(default)]
    pub schema: BTreeMap<String, FieldType>,
    /// JSON: 레코드 배열을 감싼 키 (예: CloudTrail의 "Records")
    #[serde(default)]
    pub envelope_key: Option<String>,
    /// KV/CSV: 필드 구분자
    #[serde(default)]
    pub delimiter: Option<String>,
    /// KV: 키와 값 구분자
    #[serde(default)]
    pub separator: Option<String>,
    /// CSV: 컬럼 이름
    #[serde(default)]
    pub columns: Vec<String>,
}

/// 파서 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParserKind {
    /// JSON 객체
    Json,
    /// key=value 쌍
    Kv,
    /// 구분자 기반 컬럼
    Csv,
}

impl ParserKind {
    /// 파서 이름
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Kv => "kv",
            Self::Csv => "csv",
        }
    }
}

/// 스키마 필드 타입
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// 문자열
    String,
    /// 정수
    Integer,
    /// 실수 (정수 포함)
    Float,
    /// 불리언
    Boolean,
    /// 타입 무관, 존재 여부만 검사
    Any,
}

impl FieldType {
    /// JSON 값이 이 타입에 부합하는지 확인합니다.
    pub fn accepts(&self, value: &serde_json::Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Float => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Any => true,
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}
