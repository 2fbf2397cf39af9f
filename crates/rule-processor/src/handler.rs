//! 디스패처 -- 호출 단위 배치 처리와 알림 전달 결정
//!
//! [`StreamAlert`]는 한 번의 호출에서 원시 레코드 배치를 순서대로 처리합니다.
//!
//! ```text
//! Records ─▶ resolve_source ─┬─ 미등록 ─▶ skip
//!                            ├─ s3      ─▶ pre_parse_s3 ─▶ 라인마다 process_alerts
//!                            ├─ kinesis ─▶ pre_parse_kinesis ─▶ process_alerts
//!                            ├─ sns     ─▶ pre_parse_sns ─▶ process_alerts
//!                            └─ other   ─▶ info 로그 후 skip
//!
//! process_alerts: classify ─▶ valid?  ─ yes ─▶ RuleEngine::evaluate ─▶ 누적
//!                                      └ no  ─▶ error 로그 후 drop
//!
//! 배치 종료 ─▶ return_alerts ? 알림 반환 : send_alerts (한 번)
//! ```
//!
//! 누적 알림, 마지막 페이로드, 통계는 호출마다 새로 만들어지는 `BatchState`에 있으며
//! 호출 사이에 공유되는 가변 상태는 없습니다. 따라서 하나의 `StreamAlert`를
//! `Arc`로 감싸 여러 호출에서 동시에 사용할 수 있습니다.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::Dispatch;
use tracing::instrument::WithSubscriber;

use streamalert_core::config::StreamAlertConfig;
use streamalert_core::environment::{EnvironmentDescriptor, InvocationContext};
use streamalert_core::metrics as m;
use streamalert_core::types::Alert;

use crate::classifier::StreamClassifier;
use crate::error::RuleProcessorError;
use crate::logging::LogSettings;
use crate::object_store::ObjectStore;
use crate::payload::{Payload, ServiceKind};
use crate::pre_parsers::PreParsers;
use crate::rule::RuleEngine;
use crate::sink::AlertSink;

/// 호출 단위 통계
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct InvocationStats {
    /// 배치의 원시 레코드 수
    pub records: usize,
    /// 미등록 소스로 건너뛴 레코드 수
    pub skipped_records: usize,
    /// 등록되었지만 추출 전략이 없는 서비스의 레코드 수
    pub unsupported_records: usize,
    /// 분류를 시도한 데이터 단위 수
    pub data_units: usize,
    /// 분류에 실패한 데이터 단위 수
    pub invalid_data_units: usize,
    /// 생성된 알림 수
    pub alerts: usize,
}

/// 배치 종료 시 전달 결정 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryOutcome {
    /// 개발 단계: 알림을 로컬 로그로만 출력
    LoggedLocally,
    /// 운영 단계: 싱크로 전달
    Delivered,
    /// 알림 없음, 마지막 데이터는 유효
    ValidNoAlerts,
    /// 알림 없음, 마지막 데이터가 무효이거나 없음
    NoAction,
}

/// 호출 결과
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum RunOutcome {
    /// `return_alerts` 모드: 누적 알림을 호출자에게 반환
    Returned(Vec<Alert>),
    /// 전달 결정이 수행됨
    Delivered(DeliveryOutcome),
}

/// 호출 보고서
#[derive(Debug, Clone, Serialize)]
pub struct InvocationReport {
    /// 결과
    pub outcome: RunOutcome,
    /// 통계
    pub stats: InvocationStats,
}

/// 한 번의 호출 동안만 존재하는 상태
#[derive(Debug, Default)]
struct BatchState {
    /// 누적 알림 (레코드, 라인 순서)
    alerts: Vec<Alert>,
    /// 분류 게이트를 통과한 마지막 페이로드
    ///
    /// 게이트에서 건너뛴 레코드는 이 값을 바꾸지 않습니다. 배치가 비었거나 모든 레코드가
    /// 건너뛰어졌을 때만 `None`입니다.
    last_payload: Option<Payload>,
    /// 통계
    stats: InvocationStats,
}

/// 룰 프로세서 -- 호출 단위 디스패처
pub struct StreamAlert<O: ObjectStore, S: AlertSink> {
    /// 호출 동안 불변인 설정
    config: Arc<StreamAlertConfig>,
    /// 소스 판별 및 분류
    classifier: StreamClassifier,
    /// 서비스별 추출
    pre_parsers: PreParsers<O>,
    /// 규칙 평가
    rules: Arc<RuleEngine>,
    /// 외부 전달 (return_alerts 모드에서는 없을 수 있음)
    sink: Option<Arc<S>>,
    /// 알림을 전달하지 않고 반환할지 여부
    return_alerts: bool,
    /// 호출 단위 로깅 (없으면 호스트 subscriber 사용)
    log_dispatch: Option<Dispatch>,
}

impl<O: ObjectStore, S: AlertSink> StreamAlert<O, S> {
    /// 빌더를 생성합니다.
    pub fn builder() -> StreamAlertBuilder<O, S> {
        StreamAlertBuilder::new()
    }

    /// 사용 중인 설정
    pub fn config(&self) -> &StreamAlertConfig {
        &self.config
    }

    /// `return_alerts` 모드 여부
    pub fn returns_alerts(&self) -> bool {
        self.return_alerts
    }

    /// 배치 하나를 처리합니다.
    ///
    /// `return_alerts` 모드이면 누적 알림을 `Some`으로 반환하고, 아니면 전달 결정을
    /// 한 번 수행한 뒤 `None`을 반환합니다.
    ///
    /// # Errors
    /// 실행 환경 해석, 추출, 규칙 평가, 전달 중 하나라도 실패하면 호출 전체가 실패합니다.
    pub async fn run(
        &self,
        event: &Value,
        context: &InvocationContext,
    ) -> Result<Option<Vec<Alert>>, RuleProcessorError> {
        let report = self.run_with_report(event, context).await?;
        Ok(match report.outcome {
            RunOutcome::Returned(alerts) => Some(alerts),
            RunOutcome::Delivered(_) => None,
        })
    }

    /// 배치 하나를 처리하고 결과와 통계를 반환합니다.
    pub async fn run_with_report(
        &self,
        event: &Value,
        context: &InvocationContext,
    ) -> Result<InvocationReport, RuleProcessorError> {
        match &self.log_dispatch {
            Some(dispatch) => {
                self.process_batch(event, context)
                    .with_subscriber(dispatch.clone())
                    .await
            }
            None => self.process_batch(event, context).await,
        }
    }

    async fn process_batch(
        &self,
        event: &Value,
        context: &InvocationContext,
    ) -> Result<InvocationReport, RuleProcessorError> {
        let records = event
            .get("Records")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        tracing::debug!(
            count = records.len(),
            request_id = context.request_id.as_deref().unwrap_or("-"),
            "number of records"
        );

        // 배치 전체의 전제 조건
        let env = EnvironmentDescriptor::from_context(context)?;

        let mut state = BatchState::default();

        for raw in records {
            state.stats.records += 1;
            metrics::counter!(m::RECORDS_RECEIVED_TOTAL).increment(1);

            let mut payload = Payload::new(raw.clone());
            self.classifier.resolve_source(&mut payload);

            if !payload.valid_source {
                state.stats.skipped_records += 1;
                metrics::counter!(m::RECORDS_SKIPPED_TOTAL).increment(1);
                continue;
            }

            let Some(service) = payload.service.clone() else {
                continue;
            };

            match service {
                ServiceKind::S3 => self.s3_process(&mut payload, &mut state).await?,
                ServiceKind::Kinesis => self.kinesis_process(&mut payload, &mut state)?,
                ServiceKind::Sns => self.sns_process(&mut payload, &mut state)?,
                ServiceKind::Other(name) => {
                    state.stats.unsupported_records += 1;
                    tracing::info!(
                        service = %name,
                        entity = %payload.entity,
                        "unsupported service"
                    );
                }
            }

            state.last_payload = Some(payload);
        }

        let BatchState {
            alerts,
            last_payload,
            stats,
        } = state;

        if self.return_alerts {
            return Ok(InvocationReport {
                outcome: RunOutcome::Returned(alerts),
                stats,
            });
        }

        let delivery = self
            .send_alerts(&env, last_payload.as_ref(), &alerts)
            .await?;

        Ok(InvocationReport {
            outcome: RunOutcome::Delivered(delivery),
            stats,
        })
    }

    /// 단일 이벤트 스트림 레코드: 데이터 단위 1개
    fn kinesis_process(
        &self,
        payload: &mut Payload,
        state: &mut BatchState,
    ) -> Result<(), RuleProcessorError> {
        let data = self.pre_parsers.pre_parse_kinesis(&payload.raw_record)?;
        self.process_alerts(payload, &data, state)
    }

    /// 아카이브 레코드: 라인마다 같은 페이로드를 갱신하며 처리
    async fn s3_process(
        &self,
        payload: &mut Payload,
        state: &mut BatchState,
    ) -> Result<(), RuleProcessorError> {
        let lines = self.pre_parsers.pre_parse_s3(&payload.raw_record).await?;
        for line in &lines {
            let data = line.trim_end();
            payload.reset(data);
            self.process_alerts(payload, data, state)?;
        }
        Ok(())
    }

    /// 알림 봉투 레코드: 내부 메시지 1개
    fn sns_process(
        &self,
        payload: &mut Payload,
        state: &mut BatchState,
    ) -> Result<(), RuleProcessorError> {
        let data = self.pre_parsers.pre_parse_sns(&payload.raw_record)?;
        self.process_alerts(payload, &data, state)
    }

    /// 데이터 단위 하나를 분류하고, 유효하면 규칙을 평가해 알림을 누적합니다.
    fn process_alerts(
        &self,
        payload: &mut Payload,
        data: &str,
        state: &mut BatchState,
    ) -> Result<(), RuleProcessorError> {
        state.stats.data_units += 1;
        metrics::counter!(
            m::DATA_UNITS_PROCESSED_TOTAL,
            m::LABEL_SERVICE => payload.service_name().to_owned()
        )
        .increment(1);

        self.classifier.classify(payload, data);

        if !payload.valid {
            state.stats.invalid_data_units += 1;
            metrics::counter!(
                m::INVALID_DATA_TOTAL,
                m::LABEL_SERVICE => payload.service_name().to_owned()
            )
            .increment(1);

            let raw_record = serde_json::to_string_pretty(&payload.raw_record)
                .unwrap_or_else(|_| payload.raw_record.to_string());
            tracing::error!(payload = %payload, raw_record = %raw_record, "invalid data");
            return Ok(());
        }

        let alerts = self.rules.evaluate(payload)?;
        for alert in &alerts {
            metrics::counter!(
                m::ALERTS_GENERATED_TOTAL,
                m::LABEL_SEVERITY => alert.severity.as_str()
            )
            .increment(1);
        }
        state.stats.alerts += alerts.len();
        state.alerts.extend(alerts);
        Ok(())
    }

    /// 배치 종료 후 한 번 호출되는 전달 결정
    async fn send_alerts(
        &self,
        env: &EnvironmentDescriptor,
        last_payload: Option<&Payload>,
        alerts: &[Alert],
    ) -> Result<DeliveryOutcome, RuleProcessorError> {
        if !alerts.is_empty() {
            if env.stage.is_development() {
                let rendered = serde_json::to_string_pretty(alerts)?;
                tracing::info!(count = alerts.len(), "{} alerts triggered", alerts.len());
                tracing::info!("\n{rendered}\n");
                return Ok(DeliveryOutcome::LoggedLocally);
            }

            let sink = self.sink.as_ref().ok_or_else(|| {
                RuleProcessorError::Delivery("no alert sink configured".to_owned())
            })?;
            sink.deliver(alerts, env).await?;

            metrics::counter!(m::ALERT_DELIVERIES_TOTAL, m::LABEL_STAGE => env.stage.to_string())
            .increment(1);
            tracing::info!(
                sink = sink.name(),
                count = alerts.len(),
                stage = %env.stage,
                "alerts delivered"
            );
            return Ok(DeliveryOutcome::Delivered);
        }

        if last_payload.is_some_and(|p| p.valid) {
            tracing::debug!("valid data, no alerts");
            return Ok(DeliveryOutcome::ValidNoAlerts);
        }

        Ok(DeliveryOutcome::NoAction)
    }
}

/// 룰 프로세서 빌더
pub struct StreamAlertBuilder<O: ObjectStore, S: AlertSink> {
    config: Option<Arc<StreamAlertConfig>>,
    rules: Option<Arc<RuleEngine>>,
    store: Option<Arc<O>>,
    sink: Option<Arc<S>>,
    return_alerts: bool,
    log_settings: Option<LogSettings>,
}

impl<O: ObjectStore, S: AlertSink> StreamAlertBuilder<O, S> {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self {
            config: None,
            rules: None,
            store: None,
            sink: None,
            return_alerts: false,
            log_settings: None,
        }
    }

    /// 설정을 지정합니다. (필수)
    pub fn config(mut self, config: Arc<StreamAlertConfig>) -> Self {
        self.config = Some(config);
        self
    }

    /// 규칙 엔진을 지정합니다. 지정하지 않으면 규칙이 없는 엔진을 사용합니다.
    pub fn rules(mut self, rules: Arc<RuleEngine>) -> Self {
        self.rules = Some(rules);
        self
    }

    /// 아카이브 객체 저장소를 지정합니다. (필수)
    pub fn object_store(mut self, store: Arc<O>) -> Self {
        self.store = Some(store);
        self
    }

    /// 알림 싱크를 지정합니다. `return_alerts` 모드가 아니면 필수입니다.
    pub fn sink(mut self, sink: Arc<S>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// 알림을 전달하지 않고 호출자에게 반환할지 설정합니다.
    pub fn return_alerts(mut self, enabled: bool) -> Self {
        self.return_alerts = enabled;
        self
    }

    /// 호출 단위 로깅 설정을 지정합니다.
    pub fn log_settings(mut self, settings: LogSettings) -> Self {
        self.log_settings = Some(settings);
        self
    }

    /// 프로세서를 빌드합니다.
    pub fn build(self) -> Result<StreamAlert<O, S>, RuleProcessorError> {
        let missing = |field: &str| RuleProcessorError::Config {
            field: field.to_owned(),
            reason: "must be set".to_owned(),
        };

        let config = self.config.ok_or_else(|| missing("config"))?;
        config.validate()?;

        let store = self.store.ok_or_else(|| missing("object_store"))?;

        if !self.return_alerts && self.sink.is_none() {
            return Err(RuleProcessorError::Config {
                field: "sink".to_owned(),
                reason: "a sink is required unless alerts are returned".to_owned(),
            });
        }

        let log_dispatch = self
            .log_settings
            .as_ref()
            .map(LogSettings::dispatch)
            .transpose()?;

        let pre_parsers =
            PreParsers::new(store).with_max_object_size(config.general.max_object_size);

        Ok(StreamAlert {
            classifier: StreamClassifier::new(Arc::clone(&config)),
            config,
            pre_parsers,
            rules: self.rules.unwrap_or_default(),
            sink: self.sink,
            return_alerts: self.return_alerts,
            log_dispatch,
        })
    }
}

impl<O: ObjectStore, S: AlertSink> Default for StreamAlertBuilder<O, S> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use bytes::Bytes;
    use serde_json::json;

    use super::*;
    use crate::logging::LogFormat;
    use crate::rule::RuleLoader;

    struct EmptyStore;

    impl ObjectStore for EmptyStore {
        async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes, RuleProcessorError> {
            Err(RuleProcessorError::ObjectFetch {
                bucket: bucket.to_owned(),
                key: key.to_owned(),
                reason: "empty store".to_owned(),
            })
        }
    }

    #[derive(Default)]
    struct MockSink {
        delivered: Mutex<Vec<usize>>,
    }

    impl AlertSink for MockSink {
        fn name(&self) -> &str {
            "mock"
        }

        async fn deliver(
            &self,
            alerts: &[Alert],
            _env: &EnvironmentDescriptor,
        ) -> Result<(), RuleProcessorError> {
            if let Ok(mut delivered) = self.delivered.lock() {
                delivered.push(alerts.len());
            }
            Ok(())
        }
    }

    const CONFIG: &str = r#"
[sources.sns.topic]
logs = ["osquery"]

[logs.osquery]
parser = "json"
"#;

    const RULE: &str = r#"
id: root_user
title: Root user
severity: high
detection:
  conditions:
    - field: name
      value: root
"#;

    fn context(alias: &str) -> InvocationContext {
        InvocationContext::from_arn(format!(
            "arn:aws:lambda:us-east-1:123456789012:function:rule_processor:{alias}"
        ))
    }

    fn sns_event(messages: &[&str]) -> Value {
        let records: Vec<Value> = messages
            .iter()
            .map(|m| {
                json!({
                    "EventSource": "aws:sns",
                    "Sns": {"TopicArn": "arn:aws:sns:us-east-1:123456789012:topic", "Message": m}
                })
            })
            .collect();
        json!({ "Records": records })
    }

    fn processor(return_alerts: bool) -> (StreamAlert<EmptyStore, MockSink>, Arc<MockSink>) {
        let mut engine = RuleEngine::new();
        engine
            .add_rule(RuleLoader::parse_yaml(RULE, "root.yml").unwrap())
            .unwrap();
        let sink = Arc::new(MockSink::default());
        let processor = StreamAlert::builder()
            .config(Arc::new(StreamAlertConfig::parse(CONFIG).unwrap()))
            .rules(Arc::new(engine))
            .object_store(Arc::new(EmptyStore))
            .sink(Arc::clone(&sink))
            .return_alerts(return_alerts)
            .build()
            .unwrap();
        (processor, sink)
    }

    fn deliveries(sink: &MockSink) -> Vec<usize> {
        sink.delivered.lock().map(|d| d.clone()).unwrap_or_default()
    }

    #[test]
    fn builder_requires_config_and_store() {
        let result = StreamAlertBuilder::<EmptyStore, MockSink>::new()
            .object_store(Arc::new(EmptyStore))
            .return_alerts(true)
            .build();
        assert!(matches!(result, Err(RuleProcessorError::Config { .. })));

        let result = StreamAlertBuilder::<EmptyStore, MockSink>::new()
            .config(Arc::new(StreamAlertConfig::default()))
            .return_alerts(true)
            .build();
        assert!(matches!(result, Err(RuleProcessorError::Config { .. })));
    }

    #[test]
    fn builder_requires_sink_unless_returning() {
        let base = || {
            StreamAlertBuilder::<EmptyStore, MockSink>::new()
                .config(Arc::new(StreamAlertConfig::default()))
                .object_store(Arc::new(EmptyStore))
        };
        assert!(base().build().is_err());
        assert!(base().return_alerts(true).build().is_ok());
    }

    #[test]
    fn builder_rejects_invalid_log_settings() {
        let result = StreamAlertBuilder::<EmptyStore, MockSink>::new()
            .config(Arc::new(StreamAlertConfig::default()))
            .object_store(Arc::new(EmptyStore))
            .return_alerts(true)
            .log_settings(LogSettings::new("streamalert=loud", LogFormat::Json))
            .build();
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn return_alerts_mode_skips_delivery() {
        let (processor, sink) = processor(true);
        let alerts = processor
            .run(&sns_event(&[r#"{"name":"root"}"#]), &context("production"))
            .await
            .unwrap();
        assert_eq!(alerts.map(|a| a.len()), Some(1));
        assert!(deliveries(&sink).is_empty());
    }

    #[tokio::test]
    async fn production_delivers_once() {
        let (processor, sink) = processor(false);
        let report = processor
            .run_with_report(
                &sns_event(&[r#"{"name":"root"}"#, r#"{"name":"root"}"#]),
                &context("production"),
            )
            .await
            .unwrap();
        assert!(matches!(
            report.outcome,
            RunOutcome::Delivered(DeliveryOutcome::Delivered)
        ));
        assert_eq!(deliveries(&sink), vec![2]);
    }

    #[tokio::test]
    async fn development_logs_locally() {
        let (processor, sink) = processor(false);
        let report = processor
            .run_with_report(&sns_event(&[r#"{"name":"root"}"#]), &context("development"))
            .await
            .unwrap();
        assert!(matches!(
            report.outcome,
            RunOutcome::Delivered(DeliveryOutcome::LoggedLocally)
        ));
        assert!(deliveries(&sink).is_empty());
    }

    #[tokio::test]
    async fn valid_data_without_alerts() {
        let (processor, _sink) = processor(false);
        let report = processor
            .run_with_report(&sns_event(&[r#"{"name":"alice"}"#]), &context("production"))
            .await
            .unwrap();
        assert!(matches!(
            report.outcome,
            RunOutcome::Delivered(DeliveryOutcome::ValidNoAlerts)
        ));
    }

    #[tokio::test]
    async fn invalid_context_is_fatal() {
        let (processor, _sink) = processor(false);
        let ctx = InvocationContext::from_arn("not-an-arn");
        let err = processor
            .run(&sns_event(&[r#"{"name":"root"}"#]), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, RuleProcessorError::Environment(_)));
    }

    #[tokio::test]
    async fn missing_records_is_empty_batch() {
        let (processor, sink) = processor(false);
        let report = processor
            .run_with_report(&json!({}), &context("production"))
            .await
            .unwrap();
        assert!(matches!(
            report.outcome,
            RunOutcome::Delivered(DeliveryOutcome::NoAction)
        ));
        assert_eq!(report.stats, InvocationStats::default());
        assert!(deliveries(&sink).is_empty());
    }

    #[tokio::test]
    async fn scoped_logging_runs_invocation() {
        let mut engine = RuleEngine::new();
        engine
            .add_rule(RuleLoader::parse_yaml(RULE, "root.yml").unwrap())
            .unwrap();
        let processor: StreamAlert<EmptyStore, MockSink> = StreamAlert::builder()
            .config(Arc::new(StreamAlertConfig::parse(CONFIG).unwrap()))
            .rules(Arc::new(engine))
            .object_store(Arc::new(EmptyStore))
            .return_alerts(true)
            .log_settings(LogSettings::new("off", LogFormat::Json))
            .build()
            .unwrap();
        let alerts = processor
            .run(&sns_event(&[r#"{"name":"root"}"#]), &context("development"))
            .await
            .unwrap();
        assert_eq!(alerts.map(|a| a.len()), Some(1));
    }
}
