//! 룰 프로세서 에러 타입
//!
//! [`RuleProcessorError`]는 호출 전체를 실패시키는 협력 컴포넌트 에러를 표현합니다.
//! 레코드/라인 단위 문제(미등록 소스, 분류 실패)는 에러가 아니라 로그 후 건너뛰기로 처리됩니다.
//! `From<RuleProcessorError> for StreamAlertError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 전파할 수 있습니다.

use streamalert_core::error::{ConfigError, ProcessingError, StreamAlertError};

/// 룰 프로세서 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum RuleProcessorError {
    /// 원시 레코드 구조가 서비스 형식과 맞지 않음
    #[error("malformed {service} record: {reason}")]
    MalformedRecord {
        /// 서비스명 (kinesis, s3, sns)
        service: String,
        /// 실패 사유
        reason: String,
    },

    /// 전송 인코딩 해제 실패 (base64, gzip 등)
    #[error("decode error: {service}: {reason}")]
    Decode {
        /// 서비스명
        service: String,
        /// 실패 사유
        reason: String,
    },

    /// 아카이브 객체 조회 실패
    #[error("object fetch failed: {bucket}/{key}: {reason}")]
    ObjectFetch {
        /// 버킷명
        bucket: String,
        /// 객체 키
        key: String,
        /// 실패 사유
        reason: String,
    },

    /// 아카이브 객체 크기 초과
    #[error("object too large: {bucket}/{key}: {size} bytes (max: {max})")]
    ObjectTooLarge {
        /// 버킷명
        bucket: String,
        /// 객체 키
        key: String,
        /// 실제 크기
        size: usize,
        /// 허용 크기
        max: usize,
    },

    /// 로그 데이터 파싱 실패 (분류 중 내부적으로만 사용)
    #[error("parse error: {format}: {reason}")]
    Parse {
        /// 파서 형식 (json, kv, csv)
        format: String,
        /// 실패 사유
        reason: String,
    },

    /// 룰 파일 로딩 실패
    #[error("rule load error: {path}: {reason}")]
    RuleLoad {
        /// 룰 파일 경로
        path: String,
        /// 로딩 실패 사유
        reason: String,
    },

    /// 룰 유효성 검증 실패
    #[error("rule validation error: rule '{rule_id}': {reason}")]
    RuleValidation {
        /// 문제가 된 룰 ID
        rule_id: String,
        /// 검증 실패 사유
        reason: String,
    },

    /// 룰 매칭 중 에러
    #[error("rule match error: {0}")]
    RuleMatch(String),

    /// 알림 전달 실패
    #[error("delivery error: {0}")]
    Delivery(String),

    /// 빌더/로깅 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// 실행 환경 해석 실패
    #[error("environment error: {0}")]
    Environment(#[from] ConfigError),

    /// 설정 로딩 등 core 에러
    #[error(transparent)]
    Core(#[from] StreamAlertError),

    /// JSON 직렬화 에러
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// 정규식 컴파일 에러
    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),
}

impl From<RuleProcessorError> for StreamAlertError {
    fn from(err: RuleProcessorError) -> Self {
        match err {
            RuleProcessorError::Environment(e) => StreamAlertError::Config(e),
            RuleProcessorError::Core(e) => e,
            RuleProcessorError::Io(e) => StreamAlertError::Io(e),
            RuleProcessorError::Delivery(reason) => {
                StreamAlertError::Processing(ProcessingError::Delivery(reason))
            }
            e @ (RuleProcessorError::RuleLoad { .. }
            | RuleProcessorError::RuleValidation { .. }
            | RuleProcessorError::RuleMatch(_)
            | RuleProcessorError::Regex(_)) => {
                StreamAlertError::Processing(ProcessingError::Rule(e.to_string()))
            }
            e @ RuleProcessorError::Config { .. } => {
                StreamAlertError::Config(ConfigError::InvalidValue {
                    field: "rule_processor".to_owned(),
                    reason: e.to_string(),
                })
            }
            other => StreamAlertError::Processing(ProcessingError::Extraction(other.to_string())),
        }
    }
}
