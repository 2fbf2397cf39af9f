//! 로그 파싱 모듈 -- 로그 타입별 파서와 스키마 검사
//!
//! 분류기는 설정된 로그 타입마다 [`parser_for`]로 파서를 만들어 두고,
//! 데이터 단위가 들어오면 순서대로 파싱과 [`schema_matches`] 검사를 시도합니다.
//!
//! # 지원 형식
//! - 구조화 JSON ([`JsonLogParser`])
//! - key=value 쌍 ([`KvLogParser`])
//! - 구분자 기반 컬럼 ([`CsvLogParser`])

pub mod csv;
pub mod json;
pub mod kv;

pub use csv::CsvLogParser;
pub use json::JsonLogParser;
pub use kv::KvLogParser;

use std::collections::BTreeMap;

use serde_json::Value;

use streamalert_core::config::{FieldType, LogDefinition, ParserKind};

use crate::error::RuleProcessorError;
use crate::payload::Record;

/// 로그 파서 trait
///
/// 새로운 로그 형식을 지원하려면 이 trait을 구현합니다.
/// 하나의 데이터 단위가 여러 레코드로 풀릴 수 있습니다 (예: JSON 봉투 배열).
pub trait LogParser: Send + Sync {
    /// 지원하는 로그 형식 이름
    fn format_name(&self) -> &str;

    /// 데이터 단위를 레코드 목록으로 파싱
    fn parse(&self, data: &str) -> Result<Vec<Record>, RuleProcessorError>;
}

/// 로그 정의에 맞는 파서를 생성합니다.
pub fn parser_for(definition: &LogDefinition) -> Box<dyn LogParser> {
    match definition.parser {
        ParserKind::Json => Box::new(JsonLogParser::new(definition.envelope_key.clone())),
        ParserKind::Kv => Box::new(KvLogParser::new(
            definition.delimiter.as_deref().unwrap_or(" "),
            definition.separator.as_deref().unwrap_or("="),
        )),
        ParserKind::Csv => Box::new(CsvLogParser::new(
            definition.delimiter.as_deref().unwrap_or(","),
            definition.columns.clone(),
        )),
    }
}

/// 레코드가 스키마를 만족하는지 검사합니다.
///
/// 스키마의 모든 필드가 존재하고 타입이 맞아야 합니다. 빈 스키마는 항상 만족합니다.
pub fn schema_matches(record: &Record, schema: &BTreeMap<String, FieldType>) -> bool {
    schema.iter().all(|(field, field_type)| {
        record
            .get(field)
            .is_some_and(|value| field_type.accepts(value))
    })
}

/// 텍스트 형식(kv, csv)의 값을 JSON 스칼라로 변환합니다.
///
/// 정수, 실수, 불리언으로 해석되면 해당 타입으로, 아니면 문자열로 둡니다.
/// 감싼 따옴표는 제거합니다.
pub(crate) fn coerce_scalar(raw: &str) -> Value {
    let trimmed = raw.trim();
    let unquoted = trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(trimmed);

    if unquoted.len() != trimmed.len() {
        // 따옴표로 감싼 값은 항상 문자열
        return Value::String(unquoted.to_owned());
    }
    if let Ok(n) = unquoted.parse::<i64>() {
        return Value::from(n);
    }
    if let Some(n) = unquoted
        .parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
    {
        return Value::Number(n);
    }
    match unquoted {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        other => Value::String(other.to_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn definition(parser: ParserKind) -> LogDefinition {
        LogDefinition {
            parser,
            schema: BTreeMap::new(),
            envelope_key: None,
            delimiter: None,
            separator: None,
            columns: vec!["a".to_owned(), "b".to_owned()],
        }
    }

    #[test]
    fn parser_for_selects_format() {
        assert_eq!(parser_for(&definition(ParserKind::Json)).format_name(), "json");
        assert_eq!(parser_for(&definition(ParserKind::Kv)).format_name(), "kv");
        assert_eq!(parser_for(&definition(ParserKind::Csv)).format_name(), "csv");
    }

    #[test]
    fn schema_matches_requires_all_fields() {
        let record = json!({"name": "root", "uid": 0}).as_object().cloned().unwrap();
        let mut schema = BTreeMap::new();
        schema.insert("name".to_owned(), FieldType::String);
        schema.insert("uid".to_owned(), FieldType::Integer);
        assert!(schema_matches(&record, &schema));

        schema.insert("host".to_owned(), FieldType::String);
        assert!(!schema_matches(&record, &schema));
    }

    #[test]
    fn schema_matches_checks_types() {
        let record = json!({"uid": "zero"}).as_object().cloned().unwrap();
        let mut schema = BTreeMap::new();
        schema.insert("uid".to_owned(), FieldType::Integer);
        assert!(!schema_matches(&record, &schema));
    }

    #[test]
    fn empty_schema_always_matches() {
        assert!(schema_matches(&Record::new(), &BTreeMap::new()));
    }

    #[test]
    fn coerce_scalar_types() {
        assert_eq!(coerce_scalar("42"), json!(42));
        assert_eq!(coerce_scalar("4.5"), json!(4.5));
        assert_eq!(coerce_scalar("true"), json!(true));
        assert_eq!(coerce_scalar("sshd"), json!("sshd"));
        assert_eq!(coerce_scalar("\"42\""), json!("42"));
        assert_eq!(coerce_scalar(""), json!(""));
    }
}
