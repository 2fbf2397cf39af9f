//! 탐지 규칙 데이터 타입
//!
//! YAML 규칙 파일에서 역직렬화되는 구조체들을 정의합니다.

use serde::{Deserialize, Serialize};

use streamalert_core::types::Severity;

use crate::error::RuleProcessorError;

/// 규칙 ID 최대 길이
const MAX_RULE_ID_LEN: usize = 256;

/// 탐지 규칙 -- 하나의 YAML 규칙 파일에 대응합니다.
///
/// # YAML 스키마
/// ```yaml
/// id: cloudtrail_root_login
/// title: Root Account Console Login
/// description: Detects console logins using the root account
/// severity: critical
/// status: enabled
/// logs:
///   - cloudtrail
/// detection:
///   conditions:
///     - field: eventName
///       value: ConsoleLogin
///     - field: userIdentity.type
///       value: Root
/// tags:
///   - authentication
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionRule {
    /// 규칙 고유 ID
    pub id: String,
    /// 규칙 제목 (알림에 표시)
    pub title: String,
    /// 규칙 설명
    #[serde(default)]
    pub description: String,
    /// 심각도
    pub severity: Severity,
    /// 규칙 상태
    #[serde(default)]
    pub status: RuleStatus,
    /// 적용 대상 로그 타입 (비어 있으면 모든 로그 타입에 적용)
    #[serde(default)]
    pub logs: Vec<String>,
    /// 탐지 조건
    pub detection: DetectionCondition,
    /// 분류 태그
    #[serde(default)]
    pub tags: Vec<String>,
}

impl DetectionRule {
    /// 규칙의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), RuleProcessorError> {
        if self.id.is_empty() {
            return Err(RuleProcessorError::RuleValidation {
                rule_id: "(empty)".to_owned(),
                reason: "rule id must not be empty".to_owned(),
            });
        }

        if self.id.len() > MAX_RULE_ID_LEN {
            return Err(RuleProcessorError::RuleValidation {
                rule_id: self.id.clone(),
                reason: format!("rule id must not exceed {MAX_RULE_ID_LEN} characters"),
            });
        }

        if self.title.is_empty() {
            return Err(RuleProcessorError::RuleValidation {
                rule_id: self.id.clone(),
                reason: "rule title must not be empty".to_owned(),
            });
        }

        if let Some(idx) = self
            .detection
            .conditions
            .iter()
            .position(|c| c.field.is_empty())
        {
            return Err(RuleProcessorError::RuleValidation {
                rule_id: self.id.clone(),
                reason: format!("condition[{idx}] field must not be empty"),
            });
        }

        if self.logs.iter().any(String::is_empty) {
            return Err(RuleProcessorError::RuleValidation {
                rule_id: self.id.clone(),
                reason: "log type names must not be empty".to_owned(),
            });
        }

        Ok(())
    }

    /// 이 규칙이 주어진 로그 타입에 적용되는지 확인합니다.
    pub fn applies_to(&self, log_source: &str) -> bool {
        self.logs.is_empty() || self.logs.iter().any(|l| l == log_source)
    }
}

/// 규칙 상태
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleStatus {
    /// 활성화 (기본값)
    #[default]
    Enabled,
    /// 비활성화
    Disabled,
    /// 테스트 모드 (매칭은 수행하지만 알림 생성하지 않음)
    Test,
}

/// 탐지 조건
///
/// `conditions`는 AND 로직으로 결합됩니다.
/// 모든 조건이 만족해야 규칙이 매칭됩니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectionCondition {
    /// 필드 매칭 조건 목록 (AND 결합)
    #[serde(default)]
    pub conditions: Vec<FieldCondition>,
}

/// 필드 매칭 조건
///
/// 레코드의 한 필드에 대한 조건입니다. `field`는 점(`.`)으로 중첩 객체를 따라갑니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldCondition {
    /// 대상 필드 경로 (예: `userIdentity.type`)
    pub field: String,
    /// 매칭 수정자
    #[serde(default)]
    pub modifier: ConditionModifier,
    /// 매칭할 값
    pub value: String,
}

/// 조건 수정자 -- 매칭 방식을 결정합니다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConditionModifier {
    /// 정확히 일치
    #[default]
    Exact,
    /// 부분 문자열 포함
    Contains,
    /// 접두사 일치
    StartsWith,
    /// 접미사 일치
    EndsWith,
    /// 정규식 매칭
    Regex,
}
