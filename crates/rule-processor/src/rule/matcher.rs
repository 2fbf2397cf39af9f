//! 규칙 매칭 로직 -- 조건 평가 및 정규식 캐싱
//!
//! [`RuleMatcher`]는 규칙의 조건을 파싱된 [`Record`]에 대해 평가합니다.
//! 정규식 패턴은 규칙 로딩 시 한 번만 컴파일하여 캐싱합니다.

use std::borrow::Cow;
use std::collections::HashMap;

use regex::Regex;
use serde_json::Value;

use super::types::{ConditionModifier, DetectionRule, FieldCondition};
use crate::error::RuleProcessorError;
use crate::payload::Record;

/// 규칙 매처 -- 조건 평가 및 정규식 캐싱
pub struct RuleMatcher {
    /// 컴파일된 정규식 캐시: (rule_id, condition_index) -> Regex
    regex_cache: HashMap<(String, usize), Regex>,
}

impl RuleMatcher {
    /// 새 매처를 생성합니다.
    pub fn new() -> Self {
        Self {
            regex_cache: HashMap::new(),
        }
    }

    /// 규칙의 정규식 조건을 미리 컴파일합니다.
    pub fn compile_rule(&mut self, rule: &DetectionRule) -> Result<(), RuleProcessorError> {
        for (idx, condition) in rule.detection.conditions.iter().enumerate() {
            if condition.modifier == ConditionModifier::Regex {
                let regex = Regex::new(&condition.value).map_err(|e| {
                    RuleProcessorError::RuleValidation {
                        rule_id: rule.id.clone(),
                        reason: format!(
                            "invalid regex in condition[{idx}] for field '{}': {e}",
                            condition.field
                        ),
                    }
                })?;
                self.regex_cache.insert((rule.id.clone(), idx), regex);
            }
        }
        Ok(())
    }

    /// 규칙의 모든 조건이 레코드에 매칭되는지 평가합니다.
    ///
    /// 조건은 AND 결합이며, 조건이 비어 있으면 모든 레코드에 매칭됩니다.
    pub fn matches(
        &self,
        rule: &DetectionRule,
        record: &Record,
    ) -> Result<bool, RuleProcessorError> {
        for (idx, condition) in rule.detection.conditions.iter().enumerate() {
            let matched = match field_value(record, &condition.field) {
                Some(value) => self.evaluate_condition(condition, &value, &rule.id, idx)?,
                None => false,
            };

            if !matched {
                return Ok(false);
            }
        }

        Ok(true)
    }

    /// 단일 조건을 평가합니다.
    fn evaluate_condition(
        &self,
        condition: &FieldCondition,
        field_value: &str,
        rule_id: &str,
        condition_idx: usize,
    ) -> Result<bool, RuleProcessorError> {
        match condition.modifier {
            ConditionModifier::Exact => Ok(field_value == condition.value),

            ConditionModifier::Contains => Ok(field_value.contains(&condition.value)),

            ConditionModifier::StartsWith => Ok(field_value.starts_with(&condition.value)),

            ConditionModifier::EndsWith => Ok(field_value.ends_with(&condition.value)),

            ConditionModifier::Regex => {
                let regex = self
                    .regex_cache
                    .get(&(rule_id.to_owned(), condition_idx))
                    .ok_or_else(|| {
                        RuleProcessorError::RuleMatch(format!(
                            "regex not compiled for rule '{rule_id}' condition[{condition_idx}]"
                        ))
                    })?;
                Ok(regex.is_match(field_value))
            }
        }
    }
}

impl Default for RuleMatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// 점 경로로 레코드 필드를 찾아 비교용 문자열로 돌려줍니다.
///
/// 최상위에 경로 전체와 같은 키가 있으면 그 값을 먼저 사용합니다.
/// 문자열은 그대로, 그 외 값은 JSON 표기로 변환합니다. `null`은 없는 필드로 취급합니다.
fn field_value<'a>(record: &'a Record, path: &str) -> Option<Cow<'a, str>> {
    let value = match record.get(path) {
        Some(v) => v,
        None => {
            let mut segments = path.split('.');
            let first = segments.next()?;
            segments.try_fold(record.get(first)?, |current, segment| match current {
                Value::Object(map) => map.get(segment),
                Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => None,
            })?
        }
    };

    match value {
        Value::Null => None,
        Value::String(s) => Some(Cow::Borrowed(s.as_str())),
        other => Some(Cow::Owned(other.to_string())),
    }
}
