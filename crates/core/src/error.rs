//! 에러 타입 -- 도메인별 에러 정의

/// StreamAlert 최상위 에러 타입
///
/// 호출 단위(invocation) 전체를 실패시키는 에러만 이 타입으로 올라옵니다.
/// 레코드/라인 단위 문제는 로그로 남기고 건너뛰므로 여기에 나타나지 않습니다.
#[derive(Debug, thiserror::Error)]
pub enum StreamAlertError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 레코드 처리 중 협력 컴포넌트 실패
    #[error("processing error: {0}")]
    Processing(#[from] ProcessingError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    /// 실행 컨텍스트 해석 실패
    #[error("invalid invocation context: {0}")]
    InvalidContext(String),
}

/// 레코드 처리 에러
#[derive(Debug, thiserror::Error)]
pub enum ProcessingError {
    /// 소스별 데이터 추출 실패
    #[error("extraction failed: {0}")]
    Extraction(String),

    /// 규칙 로딩/평가 실패
    #[error("rule error: {0}")]
    Rule(String),

    /// 알림 전달 실패
    #[error("delivery failed: {0}")]
    Delivery(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_converts_to_top_level() {
        let err: StreamAlertError = ConfigError::ParseFailed {
            reason: "bad toml".to_owned(),
        }
        .into();
        assert!(matches!(err, StreamAlertError::Config(_)));
        assert!(err.to_string().contains("bad toml"));
    }

    #[test]
    fn processing_error_display() {
        let err = ProcessingError::Delivery("channel closed".to_owned());
        assert_eq!(err.to_string(), "delivery failed: channel closed");
    }
}
