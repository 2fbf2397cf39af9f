//! key=value 로그 파서
//!
//! `host=web-01 user=root action=login` 형태의 한 줄 로그를 파싱합니다.
//! 구분자와 키/값 분리자는 로그 정의에서 지정합니다.

use super::{LogParser, coerce_scalar};
use crate::error::RuleProcessorError;
use crate::payload::Record;

/// key=value 로그 파서
pub struct KvLogParser {
    /// 쌍 구분자 (기본: 공백)
    delimiter: String,
    /// 키/값 분리자 (기본: "=")
    separator: String,
}

impl KvLogParser {
    /// 새 파서를 생성합니다.
    pub fn new(delimiter: &str, separator: &str) -> Self {
        Self {
            delimiter: delimiter.to_owned(),
            separator: separator.to_owned(),
        }
    }

    fn error(reason: impl Into<String>) -> RuleProcessorError {
        RuleProcessorError::Parse {
            format: "kv".to_owned(),
            reason: reason.into(),
        }
    }
}

impl LogParser for KvLogParser {
    fn format_name(&self) -> &str {
        "kv"
    }

    fn parse(&self, data: &str) -> Result<Vec<Record>, RuleProcessorError> {
        let mut record = Record::new();

        for token in data.split(self.delimiter.as_str()) {
            if token.is_empty() {
                continue;
            }
            let Some((key, value)) = token.split_once(self.separator.as_str()) else {
                return Err(Self::error(format!(
                    "token '{token}' has no '{}' separator",
                    self.separator
                )));
            };
            if key.is_empty() {
                return Err(Self::error(format!("empty key in token '{token}'")));
            }
            record.insert(key.to_owned(), coerce_scalar(value));
        }

        if record.is_empty() {
            return Err(Self::error("no key/value pairs found"));
        }

        Ok(vec![record])
    }
}
