//! 실행 환경 -- 호출 컨텍스트에서 배포 단계를 해석합니다.
//!
//! 룰 프로세서는 호출마다 [`InvocationContext`]를 받아
//! [`EnvironmentDescriptor`]를 한 번 만듭니다. 배포 단계([`Stage`])는
//! 함수 ARN의 alias 부분에서 결정되며, 알림 전달 방식을 고르는 데만 쓰입니다.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// 호출 컨텍스트 -- 호스팅 환경이 전달하는 실행 메타데이터
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InvocationContext {
    /// 실행 중인 함수 이름
    #[serde(default)]
    pub function_name: String,
    /// 호출된 함수의 전체 ARN
    /// (`arn:aws:lambda:<region>:<account>:function:<name>:<alias>`)
    pub invoked_function_arn: String,
    /// 요청 ID (있을 경우)
    #[serde(default)]
    pub request_id: Option<String>,
}

impl InvocationContext {
    /// ARN만으로 컨텍스트를 생성합니다.
    pub fn from_arn(arn: impl Into<String>) -> Self {
        Self {
            invoked_function_arn: arn.into(),
            ..Self::default()
        }
    }
}

/// 배포 단계
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// 개발 단계: 알림을 로컬 로그로만 출력
    Development,
    /// 운영 단계: 외부 싱크로 전달
    Production,
    /// 그 밖의 alias (운영과 동일하게 취급)
    Other(String),
}

impl Stage {
    /// alias 문자열을 단계로 변환합니다.
    pub fn from_alias(alias: &str) -> Self {
        match alias {
            "development" => Self::Development,
            "production" => Self::Production,
            other => Self::Other(other.to_owned()),
        }
    }

    /// 개발 단계 여부
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
            Self::Other(alias) => write!(f, "{alias}"),
        }
    }
}

/// 실행 환경 서술자
///
/// 호출 단위로 한 번 해석되며, 처리 중에는 변경되지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentDescriptor {
    /// 배포 단계
    pub stage: Stage,
    /// 리전
    pub region: String,
    /// 계정 ID
    pub account_id: String,
    /// 함수 이름
    pub function_name: String,
}

impl EnvironmentDescriptor {
    /// 호출 컨텍스트의 함수 ARN을 해석합니다.
    ///
    /// # Errors
    /// ARN 형식이 맞지 않거나 alias가 없으면 `ConfigError::InvalidContext`를 반환합니다.
    pub fn from_context(context: &InvocationContext) -> Result<Self, ConfigError> {
        let arn = context.invoked_function_arn.as_str();
        let parts: Vec<&str> = arn.split(':').collect();

        if parts.len() < 7 || parts[0] != "arn" || parts[2] != "lambda" || parts[5] != "function"
        {
            return Err(ConfigError::InvalidContext(format!(
                "malformed function arn: '{arn}'"
            )));
        }

        let alias = parts.get(7).copied().unwrap_or_default();
        if alias.is_empty() {
            return Err(ConfigError::InvalidContext(format!(
                "function arn has no alias: '{arn}'"
            )));
        }

        Ok(Self {
            stage: Stage::from_alias(alias),
            region: parts[3].to_owned(),
            account_id: parts[4].to_owned(),
            function_name: parts[6].to_owned(),
        })
    }
}
