//! 호출 단위 로깅 설정
//!
//! 프로세서는 전역 subscriber를 직접 설치하지 않습니다. 호출자가 [`LogSettings`]를
//! 빌더에 넘기면 각 호출이 그 설정으로 만든 [`Dispatch`] 아래에서 실행되고,
//! 넘기지 않으면 호스트가 설치한 subscriber를 그대로 따릅니다.

use std::fmt;
use std::str::FromStr;

use tracing::Dispatch;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;

use streamalert_core::config::GeneralConfig;

use crate::error::RuleProcessorError;

/// 로그 출력 형식
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON lines (기본값)
    #[default]
    Json,
    /// 사람이 읽기 쉬운 형식
    Pretty,
}

impl FromStr for LogFormat {
    type Err = RuleProcessorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            other => Err(RuleProcessorError::Config {
                field: "log_format".to_owned(),
                reason: format!("unknown log format '{other}', expected 'json' or 'pretty'"),
            }),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => write!(f, "json"),
            Self::Pretty => write!(f, "pretty"),
        }
    }
}

/// 호출 단위 로깅 설정
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    /// 필터 지시문 (예: "info", "streamalert_rule_processor=debug")
    pub level: String,
    /// 출력 형식
    pub format: LogFormat,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: LogFormat::Json,
        }
    }
}

impl LogSettings {
    /// 새 설정을 생성합니다.
    pub fn new(level: impl Into<String>, format: LogFormat) -> Self {
        Self {
            level: level.into(),
            format,
        }
    }

    /// `[general]` 설정의 log_level / log_format에서 생성합니다.
    pub fn from_general(general: &GeneralConfig) -> Result<Self, RuleProcessorError> {
        Ok(Self {
            level: general.log_level.clone(),
            format: general.log_format.parse()?,
        })
    }

    /// 설정으로 subscriber를 만들어 [`Dispatch`]로 반환합니다.
    ///
    /// 환경 변수는 읽지 않습니다. 출력은 stderr로 보냅니다.
    pub fn dispatch(&self) -> Result<Dispatch, RuleProcessorError> {
        let filter = EnvFilter::try_new(&self.level).map_err(|e| RuleProcessorError::Config {
            field: "log_level".to_owned(),
            reason: format!("invalid filter '{}': {e}", self.level),
        })?;

        let dispatch = match self.format {
            LogFormat::Json => Dispatch::new(
                tracing_subscriber::registry().with(filter).with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                ),
            ),
            LogFormat::Pretty => Dispatch::new(
                tracing_subscriber::registry().with(filter).with(
                    tracing_subscriber::fmt::layer()
                        .pretty()
                        .with_writer(std::io::stderr),
                ),
            ),
        };

        Ok(dispatch)
    }
}
