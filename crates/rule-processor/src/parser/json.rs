//! JSON 로그 파서
//!
//! 구조화된 JSON 로그를 파싱합니다.
//!
//! # 지원 형식
//! - 단일 JSON 객체 -> 레코드 1개
//! - 최상위 객체 배열 -> 원소마다 레코드
//! - 봉투 키(`envelope_key`) 아래의 객체 배열 -> 원소마다 레코드 (예: CloudTrail `Records`)
//!
//! # 사용 예시
//! ```ignore
//! use streamalert_rule_processor::parser::{JsonLogParser, LogParser};
//!
//! let parser = JsonLogParser::new(Some("Records".to_owned()));
//! let records = parser.parse(r#"{"Records":[{"eventName":"ConsoleLogin"}]}"#)?;
//! assert_eq!(records.len(), 1);
//! ```

use serde_json::Value;

use super::LogParser;
use crate::error::RuleProcessorError;
use crate::payload::Record;

/// JSON 로그 파서
pub struct JsonLogParser {
    /// 레코드 배열을 감싼 키
    envelope_key: Option<String>,
    /// 최대 허용 입력 크기 (바이트)
    max_input_size: usize,
}

impl JsonLogParser {
    /// 새 파서를 생성합니다.
    pub fn new(envelope_key: Option<String>) -> Self {
        Self {
            envelope_key,
            max_input_size: 1024 * 1024, // 1MB
        }
    }

    /// 최대 입력 크기를 설정합니다.
    pub fn with_max_input_size(mut self, size: usize) -> Self {
        self.max_input_size = size;
        self
    }

    fn error(reason: impl Into<String>) -> RuleProcessorError {
        RuleProcessorError::Parse {
            format: "json".to_owned(),
            reason: reason.into(),
        }
    }

    /// 객체 배열을 레코드 목록으로 변환합니다. 객체가 아닌 원소가 있으면 실패합니다.
    fn collect_objects(items: Vec<Value>) -> Result<Vec<Record>, RuleProcessorError> {
        items
            .into_iter()
            .enumerate()
            .map(|(idx, item)| match item {
                Value::Object(map) => Ok(map),
                _ => Err(Self::error(format!("element {idx} is not a JSON object"))),
            })
            .collect()
    }
}

impl Default for JsonLogParser {
    fn default() -> Self {
        Self::new(None)
    }
}

impl LogParser for JsonLogParser {
    fn format_name(&self) -> &str {
        "json"
    }

    fn parse(&self, data: &str) -> Result<Vec<Record>, RuleProcessorError> {
        if data.len() > self.max_input_size {
            return Err(Self::error(format!(
                "input too large: {} bytes (max: {})",
                data.len(),
                self.max_input_size
            )));
        }

        let value: Value = serde_json::from_str(data).map_err(|e| Self::error(e.to_string()))?;

        match (&self.envelope_key, value) {
            (Some(key), Value::Object(mut map)) => match map.remove(key) {
                Some(Value::Array(items)) => Self::collect_objects(items),
                Some(_) => Err(Self::error(format!("envelope key '{key}' is not an array"))),
                None => Err(Self::error(format!("envelope key '{key}' not found"))),
            },
            (Some(key), _) => Err(Self::error(format!(
                "expected JSON object with envelope key '{key}'"
            ))),
            (None, Value::Object(map)) => Ok(vec![map]),
            (None, Value::Array(items)) => Self::collect_objects(items),
            (None, _) => Err(Self::error("expected JSON object or array at top level")),
        }
    }
}
