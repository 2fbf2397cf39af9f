//! 구분자 기반 컬럼 로그 파서
//!
//! 컬럼 이름이 설정된 한 줄 로그를 파싱합니다. 필드 수가 컬럼 수와 정확히
//! 일치해야 하며, 따옴표 안의 구분자는 필드의 일부로 취급합니다.

use super::{LogParser, coerce_scalar};
use crate::error::RuleProcessorError;
use crate::payload::Record;

/// 구분자 기반 컬럼 로그 파서
pub struct CsvLogParser {
    /// 필드 구분자 (첫 문자만 사용, 기본: ',')
    delimiter: char,
    /// 컬럼 이름
    columns: Vec<String>,
}

impl CsvLogParser {
    /// 새 파서를 생성합니다.
    pub fn new(delimiter: &str, columns: Vec<String>) -> Self {
        Self {
            delimiter: delimiter.chars().next().unwrap_or(','),
            columns,
        }
    }

    fn error(reason: impl Into<String>) -> RuleProcessorError {
        RuleProcessorError::Parse {
            format: "csv".to_owned(),
            reason: reason.into(),
        }
    }

    /// 따옴표를 고려하여 한 줄을 필드로 나눕니다.
    ///
    /// 따옴표 안의 `""`는 따옴표 하나로 풀립니다.
    fn split_fields(&self, line: &str) -> Result<Vec<Field>, RuleProcessorError> {
        let mut fields = Vec::new();
        let mut current = Field::default();
        let mut in_quotes = false;
        let mut chars = line.chars().peekable();

        while let Some(ch) = chars.next() {
            match ch {
                '"' if in_quotes => {
                    if chars.peek() == Some(&'"') {
                        chars.next();
                        current.text.push('"');
                    } else {
                        in_quotes = false;
                    }
                }
                '"' => {
                    in_quotes = true;
                    current.quoted = true;
                }
                c if c == self.delimiter && !in_quotes => {
                    fields.push(std::mem::take(&mut current));
                }
                c => current.text.push(c),
            }
        }

        if in_quotes {
            return Err(Self::error("unterminated quoted field"));
        }
        fields.push(current);
        Ok(fields)
    }
}

/// 분리된 필드 하나
#[derive(Debug, Default)]
struct Field {
    text: String,
    /// 따옴표로 감싸진 필드는 타입 변환 없이 문자열로 유지
    quoted: bool,
}

impl Field {
    fn into_value(self) -> serde_json::Value {
        if self.quoted {
            serde_json::Value::String(self.text)
        } else {
            coerce_scalar(&self.text)
        }
    }
}

impl LogParser for CsvLogParser {
    fn format_name(&self) -> &str {
        "csv"
    }

    fn parse(&self, data: &str) -> Result<Vec<Record>, RuleProcessorError> {
        if data.trim().is_empty() {
            return Err(Self::error("empty line"));
        }

        let fields = self.split_fields(data)?;
        if fields.len() != self.columns.len() {
            return Err(Self::error(format!(
                "expected {} fields, found {}",
                self.columns.len(),
                fields.len()
            )));
        }

        let record = self
            .columns
            .iter()
            .zip(fields)
            .map(|(column, field)| (column.clone(), field.into_value()))
            .collect();

        Ok(vec![record])
    }
}
