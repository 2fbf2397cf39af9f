//! 사전 파서 -- 서비스별 원시 레코드에서 데이터 단위 추출
//!
//! | 서비스  | 원시 레코드             | 추출 결과                      |
//! |---------|-------------------------|--------------------------------|
//! | Kinesis | `kinesis.data` (base64) | 문자열 1개 (gzip이면 해제)     |
//! | S3      | 버킷/키 포인터          | 객체 내용의 라인 목록 (순서 유지) |
//! | SNS     | `Sns.Message`           | 문자열 1개                     |
//!
//! 봉투 구조가 잘못되었거나 객체를 가져올 수 없으면 `Err`를 반환하며,
//! 이는 호출 전체를 실패시킵니다.

use std::io::Read;
use std::sync::Arc;

use base64::Engine as _;
use serde_json::Value;

use crate::error::RuleProcessorError;
use crate::object_store::ObjectStore;

/// gzip 매직 바이트
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// 기본 최대 객체 크기 (128MB)
pub const DEFAULT_MAX_OBJECT_SIZE: usize = 128 * 1024 * 1024;

/// 서비스별 사전 파서
pub struct PreParsers<O: ObjectStore> {
    /// 아카이브 객체 저장소
    store: Arc<O>,
    /// 객체(압축 해제 후 포함) 최대 크기
    max_object_size: usize,
}

impl<O: ObjectStore> PreParsers<O> {
    /// 새 사전 파서를 생성합니다.
    pub fn new(store: Arc<O>) -> Self {
        Self {
            store,
            max_object_size: DEFAULT_MAX_OBJECT_SIZE,
        }
    }

    /// 최대 객체 크기를 설정합니다.
    pub fn with_max_object_size(mut self, size: usize) -> Self {
        self.max_object_size = size;
        self
    }

    /// 단일 이벤트 스트림 레코드를 데이터 문자열로 변환합니다.
    pub fn pre_parse_kinesis(&self, raw: &Value) -> Result<String, RuleProcessorError> {
        let encoded = raw
            .pointer("/kinesis/data")
            .and_then(Value::as_str)
            .ok_or_else(|| malformed("kinesis", "missing kinesis.data"))?;

        let decoded = base64::engine::general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|e| RuleProcessorError::Decode {
                service: "kinesis".to_owned(),
                reason: format!("invalid base64: {e}"),
            })?;

        let bytes = if is_gzip(&decoded) {
            gunzip(&decoded, self.max_object_size).map_err(|reason| {
                RuleProcessorError::Decode {
                    service: "kinesis".to_owned(),
                    reason,
                }
            })?
        } else {
            decoded
        };

        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// 아카이브 포인터 레코드가 가리키는 객체를 가져와 라인 목록으로 변환합니다.
    ///
    /// 라인 순서는 객체 내 순서를 따르며, 줄바꿈 문자 외에는 아무것도 제거하지 않습니다.
    pub async fn pre_parse_s3(&self, raw: &Value) -> Result<Vec<String>, RuleProcessorError> {
        let bucket = raw
            .pointer("/s3/bucket/name")
            .and_then(Value::as_str)
            .ok_or_else(|| malformed("s3", "missing s3.bucket.name"))?;
        let raw_key = raw
            .pointer("/s3/object/key")
            .and_then(Value::as_str)
            .ok_or_else(|| malformed("s3", "missing s3.object.key"))?;
        let key = decode_object_key(raw_key);

        let too_large = |size: usize| RuleProcessorError::ObjectTooLarge {
            bucket: bucket.to_owned(),
            key: key.clone(),
            size,
            max: self.max_object_size,
        };

        // 알림에 크기가 있으면 가져오기 전에 거부
        if let Some(size) = raw.pointer("/s3/object/size").and_then(Value::as_u64) {
            let size = usize::try_from(size).unwrap_or(usize::MAX);
            if size > self.max_object_size {
                return Err(too_large(size));
            }
        }

        let content = self.store.get_object(bucket, &key).await?;
        if content.len() > self.max_object_size {
            return Err(too_large(content.len()));
        }

        let bytes = if key.ends_with(".gz") || is_gzip(&content) {
            gunzip(&content, self.max_object_size).map_err(|reason| {
                RuleProcessorError::Decode {
                    service: "s3".to_owned(),
                    reason: format!("{bucket}/{key}: {reason}"),
                }
            })?
        } else {
            content.to_vec()
        };

        let text = String::from_utf8_lossy(&bytes);
        let lines: Vec<String> = text.lines().map(str::to_owned).collect();

        tracing::debug!(bucket, key = %key, lines = lines.len(), "extracted s3 object");
        Ok(lines)
    }

    /// 알림 봉투 레코드에서 메시지 본문을 꺼냅니다.
    pub fn pre_parse_sns(&self, raw: &Value) -> Result<String, RuleProcessorError> {
        raw.pointer("/Sns/Message")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or_else(|| malformed("sns", "missing Sns.Message"))
    }
}

fn malformed(service: &str, reason: &str) -> RuleProcessorError {
    RuleProcessorError::MalformedRecord {
        service: service.to_owned(),
        reason: reason.to_owned(),
    }
}

fn is_gzip(data: &[u8]) -> bool {
    data.starts_with(&GZIP_MAGIC)
}

/// gzip을 해제합니다. 결과가 `max`바이트를 넘으면 실패합니다.
fn gunzip(data: &[u8], max: usize) -> Result<Vec<u8>, String> {
    let limit = u64::try_from(max).unwrap_or(u64::MAX).saturating_add(1);
    let mut out = Vec::new();
    flate2::read::GzDecoder::new(data)
        .take(limit)
        .read_to_end(&mut out)
        .map_err(|e| format!("gzip decompression failed: {e}"))?;

    if out.len() > max {
        return Err(format!("decompressed size exceeds {max} bytes"));
    }
    Ok(out)
}

/// S3 알림의 URL 인코딩된 객체 키를 복원합니다. (`+`는 공백)
///
/// 잘못된 퍼센트 시퀀스는 그대로 둡니다.
fn decode_object_key(key: &str) -> String {
    let bytes = key.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b'%' => {
                let hex = bytes
                    .get(i + 1..i + 3)
                    .and_then(|h| std::str::from_utf8(h).ok())
                    .and_then(|h| u8::from_str_radix(h, 16).ok());
                match hex {
                    Some(b) => {
                        out.push(b);
                        i += 3;
                    }
                    None => {
                        out.push(b'%');
                        i += 1;
                    }
                }
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }

    String::from_utf8_lossy(&out).into_owned()
}
