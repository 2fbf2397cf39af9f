//! 탐지 규칙 엔진 -- YAML 기반 레코드 매칭 및 알림 생성
//!
//! 간소화된 Sigma 스타일의 YAML 규칙을 로드하여
//! 분류된 [`Payload`]의 레코드에 대한 패턴 매칭을 수행합니다.
//!
//! # 아키텍처
//! - [`RuleEngine`]: 규칙 관리 및 매칭 코디네이터
//! - [`loader`]: YAML 파일 로딩 및 유효성 검증
//! - [`matcher`]: 조건 매칭 로직 (exact, contains, regex 등)
//! - [`types`]: 규칙 데이터 구조 정의

pub mod loader;
pub mod matcher;
pub mod types;

pub use loader::RuleLoader;
pub use matcher::RuleMatcher;
pub use types::{ConditionModifier, DetectionCondition, DetectionRule, FieldCondition, RuleStatus};

use std::path::Path;
use std::time::SystemTime;

use serde_json::Value;

use streamalert_core::types::Alert;

use crate::error::RuleProcessorError;
use crate::payload::{Payload, Record};

/// 규칙 엔진 -- 탐지 규칙 관리 및 매칭 코디네이터
///
/// 규칙은 로드 순서대로 평가됩니다. 평가 중 상태를 변경하지 않으므로
/// 여러 호출이 하나의 엔진을 공유할 수 있습니다.
///
/// # 사용 예시
/// ```ignore
/// let mut engine = RuleEngine::new();
/// engine.load_rules_from_dir("/etc/streamalert/rules").await?;
///
/// let alerts = engine.evaluate(&payload)?;
/// ```
pub struct RuleEngine {
    /// 규칙 목록 (로드 순서)
    rules: Vec<DetectionRule>,
    /// 컴파일된 매처
    matcher: RuleMatcher,
}

impl RuleEngine {
    /// 새 규칙 엔진을 생성합니다.
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            matcher: RuleMatcher::new(),
        }
    }

    /// 디렉토리에서 YAML 규칙 파일을 로드합니다. 추가된 규칙 수를 반환합니다.
    pub async fn load_rules_from_dir(
        &mut self,
        dir: impl AsRef<Path>,
    ) -> Result<usize, RuleProcessorError> {
        let rules = RuleLoader::load_directory(dir).await?;
        let count = rules.len();
        for rule in rules {
            self.add_rule(rule)?;
        }
        Ok(count)
    }

    /// 단일 규칙을 추가합니다.
    ///
    /// 이미 같은 ID의 규칙이 있으면 실패합니다.
    pub fn add_rule(&mut self, rule: DetectionRule) -> Result<(), RuleProcessorError> {
        rule.validate()?;
        if self.rules.iter().any(|r| r.id == rule.id) {
            return Err(RuleProcessorError::RuleValidation {
                rule_id: rule.id,
                reason: "duplicate rule id".to_owned(),
            });
        }
        self.matcher.compile_rule(&rule)?;
        self.rules.push(rule);
        Ok(())
    }

    /// 현재 로드된 규칙 수를 반환합니다.
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// 로드된 규칙 목록
    pub fn rules(&self) -> &[DetectionRule] {
        &self.rules
    }

    /// 분류된 페이로드를 평가합니다.
    ///
    /// 페이로드의 레코드를 순서대로, 각 레코드마다 로그 타입에 적용되는 활성 규칙을
    /// 로드 순서대로 검사하여 매칭마다 알림을 하나씩 생성합니다.
    /// 분류되지 않은 페이로드는 빈 결과를 반환합니다.
    pub fn evaluate(&self, payload: &Payload) -> Result<Vec<Alert>, RuleProcessorError> {
        let Some(log_source) = payload.log_source.as_deref() else {
            return Ok(Vec::new());
        };

        let mut alerts = Vec::new();

        for record in &payload.records {
            for rule in &self.rules {
                if rule.status == RuleStatus::Disabled || !rule.applies_to(log_source) {
                    continue;
                }

                if !self.matcher.matches(rule, record)? {
                    continue;
                }

                if rule.status == RuleStatus::Test {
                    tracing::debug!(
                        rule_id = %rule.id,
                        log_source,
                        "test rule matched, alert suppressed"
                    );
                    continue;
                }

                alerts.push(Self::rule_match_to_alert(rule, payload, record));
            }
        }

        Ok(alerts)
    }

    /// 규칙 매칭 결과를 Alert로 변환합니다.
    pub fn rule_match_to_alert(rule: &DetectionRule, payload: &Payload, record: &Record) -> Alert {
        Alert {
            id: Alert::new_id(),
            rule_name: rule.id.clone(),
            title: rule.title.clone(),
            description: rule.description.clone(),
            severity: rule.severity,
            log_source: payload.log_source.clone().unwrap_or_default(),
            log_type: payload
                .log_type
                .map(|t| t.as_str().to_owned())
                .unwrap_or_default(),
            source_service: payload.service_name().to_owned(),
            source_entity: payload.entity.clone(),
            record: Value::Object(record.clone()),
            tags: rule.tags.clone(),
            created_at: SystemTime::now(),
        }
    }
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::ServiceKind;
    use serde_json::json;
    use streamalert_core::config::ParserKind;
    use streamalert_core::types::Severity;

    fn rule(id: &str, logs: &[&str], field: &str, value: &str) -> DetectionRule {
        DetectionRule {
            id: id.to_owned(),
            title: format!("{id} title"),
            description: String::new(),
            severity: Severity::High,
            status: RuleStatus::Enabled,
            logs: logs.iter().map(|s| (*s).to_owned()).collect(),
            detection: DetectionCondition {
                conditions: vec![FieldCondition {
                    field: field.to_owned(),
                    modifier: ConditionModifier::Exact,
                    value: value.to_owned(),
                }],
            },
            tags: vec!["tag".to_owned()],
        }
    }

    fn payload(log_source: &str, records: Vec<Value>) -> Payload {
        let mut payload = Payload::new(json!({}));
        payload.service = Some(ServiceKind::Kinesis);
        payload.entity = "prod_stream".to_owned();
        payload.reset("data");
        payload.valid = true;
        payload.log_source = Some(log_source.to_owned());
        payload.log_type = Some(ParserKind::Json);
        payload.records = records
            .into_iter()
            .filter_map(|v| v.as_object().cloned())
            .collect();
        payload
    }

    #[test]
    fn engine_starts_empty() {
        assert_eq!(RuleEngine::new().rule_count(), 0);
    }

    #[test]
    fn duplicate_rule_id_rejected() {
        let mut engine = RuleEngine::new();
        engine.add_rule(rule("r1", &[], "name", "root")).unwrap();
        assert!(engine.add_rule(rule("r1", &[], "name", "other")).is_err());
        assert_eq!(engine.rule_count(), 1);
    }

    #[test]
    fn evaluate_produces_alert_with_context() {
        let mut engine = RuleEngine::new();
        engine.add_rule(rule("root_user", &["osquery"], "name", "root")).unwrap();

        let alerts = engine
            .evaluate(&payload("osquery", vec![json!({"name": "root"})]))
            .unwrap();
        assert_eq!(alerts.len(), 1);
        let alert = &alerts[0];
        assert_eq!(alert.rule_name, "root_user");
        assert_eq!(alert.severity, Severity::High);
        assert_eq!(alert.log_source, "osquery");
        assert_eq!(alert.log_type, "json");
        assert_eq!(alert.source_service, "kinesis");
        assert_eq!(alert.source_entity, "prod_stream");
        assert_eq!(alert.record, json!({"name": "root"}));
        assert_eq!(alert.tags, vec!["tag".to_owned()]);
    }

    #[test]
    fn each_alert_gets_its_own_id() {
        let mut engine = RuleEngine::new();
        engine.add_rule(rule("root_user", &[], "name", "root")).unwrap();

        let alerts = engine
            .evaluate(&payload(
                "osquery",
                vec![json!({"name": "root"}), json!({"name": "root"})],
            ))
            .unwrap();
        assert_eq!(alerts.len(), 2);
        assert_ne!(alerts[0].id, alerts[1].id);
        assert_eq!(alerts[0].id.len(), 36);
    }

    #[test]
    fn evaluate_skips_rules_for_other_logs() {
        let mut engine = RuleEngine::new();
        engine.add_rule(rule("ct_only", &["cloudtrail"], "name", "root")).unwrap();
        let alerts = engine
            .evaluate(&payload("osquery", vec![json!({"name": "root"})]))
            .unwrap();
        assert!(alerts.is_empty());
    }

    #[test]
    fn evaluate_orders_by_record_then_rule() {
        let mut engine = RuleEngine::new();
        engine.add_rule(rule("second", &[], "kind", "x")).unwrap();
        engine.add_rule(rule("first", &[], "kind", "x")).unwrap();

        let alerts = engine
            .evaluate(&payload(
                "osquery",
                vec![json!({"kind": "x", "n": 1}), json!({"kind": "x", "n": 2})],
            ))
            .unwrap();
        let order: Vec<_> = alerts
            .iter()
            .map(|a| (a.rule_name.as_str(), a.record["n"].as_i64().unwrap_or_default()))
            .collect();
        assert_eq!(
            order,
            vec![("second", 1), ("first", 1), ("second", 2), ("first", 2)]
        );
    }

    #[test]
    fn disabled_and_test_rules_produce_no_alerts() {
        let mut engine = RuleEngine::new();
        let mut disabled = rule("disabled", &[], "name", "root");
        disabled.status = RuleStatus::Disabled;
        let mut test = rule("test", &[], "name", "root");
        test.status = RuleStatus::Test;
        engine.add_rule(disabled).unwrap();
        engine.add_rule(test).unwrap();

        let alerts = engine
            .evaluate(&payload("osquery", vec![json!({"name": "root"})]))
            .unwrap();
        assert!(alerts.is_empty());
    }

    #[test]
    fn unclassified_payload_yields_nothing() {
        let mut engine = RuleEngine::new();
        engine.add_rule(rule("any", &[], "name", "root")).unwrap();
        let payload = Payload::new(json!({}));
        assert!(engine.evaluate(&payload).unwrap().is_empty());
    }
}
