//! 도메인 타입 -- 룰 프로세서 전역에서 사용되는 공통 타입
//!
//! 규칙 평가 결과인 [`Alert`]와 그 심각도 [`Severity`]를 정의합니다.

use std::fmt;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// 보안 알림
///
/// 분류된 레코드가 탐지 규칙에 매칭되어 생성된 결과입니다.
/// 한 번의 호출(invocation) 동안 누적되었다가 배치 종료 시 한 번에 전달됩니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// 알림 ID (UUID v4)
    pub id: String,
    /// 탐지 규칙 ID
    pub rule_name: String,
    /// 알림 제목
    pub title: String,
    /// 상세 설명
    #[serde(default)]
    pub description: String,
    /// 심각도
    pub severity: Severity,
    /// 분류된 로그 타입 (예: "osquery", "cloudtrail")
    pub log_source: String,
    /// 로그를 해석한 파서 이름 (json, kv, csv)
    pub log_type: String,
    /// 레코드를 전달한 수집 서비스 (kinesis, s3, sns)
    pub source_service: String,
    /// 서비스 내 엔티티 (스트림 이름, 버킷 이름, 토픽 이름)
    pub source_entity: String,
    /// 규칙에 매칭된 파싱 레코드
    pub record: serde_json::Value,
    /// 규칙 태그
    #[serde(default)]
    pub tags: Vec<String>,
    /// 생성 시각
    pub created_at: SystemTime,
}

impl Alert {
    /// 새 알림 ID (UUID v4)를 생성합니다.
    pub fn new_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} (rule: {}, source: {}/{})",
            self.severity, self.title, self.rule_name, self.source_service, self.source_entity,
        )
    }
}

/// 심각도 레벨
///
/// `Ord` 구현으로 심각도 비교가 가능합니다 (`Info < Low < Medium < High < Critical`).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// 정보성 이벤트
    #[default]
    Info,
    /// 낮은 심각도
    Low,
    /// 중간 심각도
    Medium,
    /// 높은 심각도
    High,
    /// 치명적 -- 즉시 대응 필요
    Critical,
}

impl Severity {
    /// 문자열에서 심각도를 파싱합니다.
    ///
    /// 대소문자를 구분하지 않습니다.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "info" | "informational" => Some(Self::Info),
            "low" => Some(Self::Low),
            "medium" | "med" => Some(Self::Medium),
            "high" => Some(Self::High),
            "critical" | "crit" => Some(Self::Critical),
            _ => None,
        }
    }

    /// 메트릭 레이블 등에 쓰는 소문자 이름
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "Info"),
            Self::Low => write!(f, "Low"),
            Self::Medium => write!(f, "Medium"),
            Self::High => write!(f, "High"),
            Self::Critical => write!(f, "Critical"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_alert() -> Alert {
        Alert {
            id: "a-1".to_owned(),
            rule_name: "invalid_user".to_owned(),
            title: "Invalid user login".to_owned(),
            description: String::new(),
            severity: Severity::High,
            log_source: "osquery".to_owned(),
            log_type: "json".to_owned(),
            source_service: "kinesis".to_owned(),
            source_entity: "prod_stream".to_owned(),
            record: serde_json::json!({"name": "root"}),
            tags: vec![],
            created_at: SystemTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn new_id_is_unique_uuid() {
        let a = Alert::new_id();
        let b = Alert::new_id();
        assert_ne!(a, b);
        let parsed = uuid::Uuid::parse_str(&a).unwrap();
        assert_eq!(parsed.get_version_num(), 4);
    }

    #[test]
    fn severity_ordering() {
        assert!(Severity::Info < Severity::Low);
        assert!(Severity::High < Severity::Critical);
    }

    #[test]
    fn severity_from_str_loose() {
        assert_eq!(Severity::from_str_loose("HIGH"), Some(Severity::High));
        assert_eq!(Severity::from_str_loose("crit"), Some(Severity::Critical));
        assert_eq!(Severity::from_str_loose("urgent"), None);
    }

    #[test]
    fn severity_deserializes_lowercase() {
        let sev: Severity = serde_json::from_str("\"medium\"").unwrap();
        assert_eq!(sev, Severity::Medium);
        assert_eq!(sev.as_str(), "medium");
    }

    #[test]
    fn alert_display_includes_rule_and_source() {
        let shown = sample_alert().to_string();
        assert!(shown.contains("invalid_user"));
        assert!(shown.contains("kinesis/prod_stream"));
        assert!(shown.starts_with("[High]"));
    }

    #[test]
    fn alert_serializes_record() {
        let json = serde_json::to_value(sample_alert()).unwrap();
        assert_eq!(json["record"]["name"], "root");
        assert_eq!(json["severity"], "high");
    }
}
