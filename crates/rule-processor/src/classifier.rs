//! 분류기 -- 소스 판별(분류 게이트)과 데이터 단위 분류
//!
//! [`StreamClassifier`]는 두 단계로 동작합니다.
//!
//! 1. [`resolve_source`](StreamClassifier::resolve_source): 원시 레코드의 형태에서
//!    서비스와 엔티티를 판별하고, 설정에 등록된 소스인지(`valid_source`) 결정합니다.
//!    원시 레코드마다 추출 전에 한 번 호출됩니다.
//! 2. [`classify`](StreamClassifier::classify): 추출된 데이터 단위를 엔티티에 허용된
//!    로그 타입 순서대로 파싱해 보고, 처음 성공한 타입으로 페이로드를 채웁니다.
//!    데이터 단위마다 호출되며, 항상 [`Payload::reset`]부터 수행합니다.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use streamalert_core::config::StreamAlertConfig;

use crate::parser::{LogParser, parser_for, schema_matches};
use crate::payload::{Payload, ServiceKind};

/// 스트림 분류기
///
/// 설정을 공유 참조로 보관하며 처리 중 상태를 갖지 않습니다.
pub struct StreamClassifier {
    /// 호출 동안 불변인 설정
    config: Arc<StreamAlertConfig>,
    /// 로그 타입명 -> 파서
    parsers: HashMap<String, Box<dyn LogParser>>,
}

impl StreamClassifier {
    /// 설정의 모든 로그 정의에 대해 파서를 준비합니다.
    pub fn new(config: Arc<StreamAlertConfig>) -> Self {
        let parsers = config
            .logs
            .iter()
            .map(|(name, definition)| (name.clone(), parser_for(definition)))
            .collect();
        Self { config, parsers }
    }

    /// 원시 레코드의 서비스/엔티티를 판별하고 `valid_source`를 설정합니다.
    pub fn resolve_source(&self, payload: &mut Payload) {
        let Some((service, entity)) = detect_service(&payload.raw_record) else {
            tracing::debug!("unable to determine service of raw record");
            payload.service = None;
            payload.valid_source = false;
            return;
        };

        payload.valid_source = self
            .config
            .source_entity(service.as_str(), &entity)
            .is_some();

        if !payload.valid_source {
            tracing::debug!(
                service = %service,
                entity = %entity,
                "source not found in config"
            );
        }

        payload.service = Some(service);
        payload.entity = entity;
    }

    /// 데이터 단위를 분류합니다.
    ///
    /// 페이로드를 `data`로 리셋한 뒤, 엔티티에 허용된 로그 타입을 설정 순서대로 시도합니다.
    /// 파싱에 성공하고 모든 레코드가 스키마를 만족하는 첫 타입이 선택되며 `valid = true`가 됩니다.
    /// 어느 타입도 맞지 않으면 `valid = false`로 남습니다.
    pub fn classify(&self, payload: &mut Payload, data: &str) {
        payload.reset(data);

        let Some(service) = payload.service.as_ref() else {
            return;
        };
        let Some(source) = self.config.source_entity(service.as_str(), &payload.entity) else {
            return;
        };

        for log_name in &source.logs {
            let (Some(definition), Some(parser)) = (
                self.config.log_definition(log_name),
                self.parsers.get(log_name),
            ) else {
                continue;
            };

            match parser.parse(data) {
                Ok(records)
                    if !records.is_empty()
                        && records
                            .iter()
                            .all(|r| schema_matches(r, &definition.schema)) =>
                {
                    payload.log_source = Some(log_name.clone());
                    payload.log_type = Some(definition.parser);
                    payload.records = records;
                    payload.valid = true;
                    return;
                }
                Ok(_) => {
                    tracing::trace!(log_source = %log_name, "schema mismatch");
                }
                Err(e) => {
                    tracing::trace!(log_source = %log_name, error = %e, "parser rejected data");
                }
            }
        }
    }
}

/// 원시 레코드에서 (서비스, 엔티티)를 판별합니다.
fn detect_service(raw: &Value) -> Option<(ServiceKind, String)> {
    if raw.get("kinesis").is_some() {
        let entity = raw
            .get("eventSourceARN")
            .and_then(Value::as_str)
            .and_then(|arn| arn.rsplit('/').next())?;
        return Some((ServiceKind::Kinesis, entity.to_owned()));
    }

    if let Some(s3) = raw.get("s3") {
        let entity = s3.pointer("/bucket/name").and_then(Value::as_str)?;
        return Some((ServiceKind::S3, entity.to_owned()));
    }

    if let Some(sns) = raw.get("Sns") {
        let entity = sns
            .get("TopicArn")
            .and_then(Value::as_str)
            .and_then(|arn| arn.rsplit(':').next())?;
        return Some((ServiceKind::Sns, entity.to_owned()));
    }

    // 그 밖의 서비스: "aws:<name>" 형태의 이벤트 소스
    let event_source = raw
        .get("eventSource")
        .or_else(|| raw.get("EventSource"))
        .and_then(Value::as_str)?;
    let name = event_source.strip_prefix("aws:")?;
    let entity = raw
        .get("eventSourceARN")
        .or_else(|| raw.get("EventSourceArn"))
        .and_then(Value::as_str)
        .and_then(|arn| arn.rsplit(['/', ':']).next())?;

    let service = match name {
        "kinesis" => ServiceKind::Kinesis,
        "s3" => ServiceKind::S3,
        "sns" => ServiceKind::Sns,
        other => ServiceKind::Other(other.to_owned()),
    };
    Some((service, entity.to_owned()))
}
