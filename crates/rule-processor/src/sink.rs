//! 알림 싱크 -- 운영 단계에서 누적된 알림을 외부로 전달
//!
//! [`AlertSink`]는 배치 종료 시 한 번 호출되며, 호출 전체의 알림을 한꺼번에 받습니다.
//! 전달 실패는 `Err`로 호출자에게 전파됩니다. 재시도는 하지 않습니다.
//!
//! # 구현체
//! - [`ChannelSink`]: `tokio::sync::mpsc` 채널로 [`AlertBatch`]를 넘깁니다.
//! - [`JsonLinesSink`]: 알림마다 JSON 문서 한 줄을 파일에 덧붙입니다.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;

use streamalert_core::environment::EnvironmentDescriptor;
use streamalert_core::types::Alert;

use crate::error::RuleProcessorError;

/// 알림 전달 trait
pub trait AlertSink: Send + Sync + 'static {
    /// 싱크 이름 (로그용)
    fn name(&self) -> &str;

    /// 호출 전체의 알림을 전달합니다.
    fn deliver(
        &self,
        alerts: &[Alert],
        env: &EnvironmentDescriptor,
    ) -> impl Future<Output = Result<(), RuleProcessorError>> + Send;
}

/// 한 번의 전달 단위
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertBatch {
    /// 배치 ID (UUID v4)
    pub id: String,
    /// 전달 시점의 실행 환경
    pub environment: EnvironmentDescriptor,
    /// 누적 순서대로의 알림
    pub alerts: Vec<Alert>,
    /// 배치 생성 시각
    pub created_at: SystemTime,
}

impl AlertBatch {
    /// 새 배치를 생성합니다.
    pub fn new(alerts: &[Alert], env: &EnvironmentDescriptor) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            environment: env.clone(),
            alerts: alerts.to_vec(),
            created_at: SystemTime::now(),
        }
    }
}

/// mpsc 채널 싱크
pub struct ChannelSink {
    tx: mpsc::Sender<AlertBatch>,
}

impl ChannelSink {
    /// 송신 측으로 싱크를 생성합니다.
    pub fn new(tx: mpsc::Sender<AlertBatch>) -> Self {
        Self { tx }
    }

    /// 용량 `capacity`의 채널을 만들고 싱크와 수신 측을 함께 반환합니다.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<AlertBatch>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }
}

impl AlertSink for ChannelSink {
    fn name(&self) -> &str {
        "channel"
    }

    async fn deliver(
        &self,
        alerts: &[Alert],
        env: &EnvironmentDescriptor,
    ) -> Result<(), RuleProcessorError> {
        self.tx
            .send(AlertBatch::new(alerts, env))
            .await
            .map_err(|_| RuleProcessorError::Delivery("alert channel closed".to_owned()))
    }
}

/// JSON Lines 파일 싱크
pub struct JsonLinesSink {
    path: PathBuf,
}

impl JsonLinesSink {
    /// 출력 파일 경로로 싱크를 생성합니다. 파일은 첫 전달 시 생성됩니다.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// 출력 파일 경로
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AlertSink for JsonLinesSink {
    fn name(&self) -> &str {
        "jsonl"
    }

    async fn deliver(
        &self,
        alerts: &[Alert],
        env: &EnvironmentDescriptor,
    ) -> Result<(), RuleProcessorError> {
        let delivery_error = |e: std::io::Error| {
            RuleProcessorError::Delivery(format!("{}: {e}", self.path.display()))
        };

        let mut buf = Vec::new();
        for alert in alerts {
            serde_json::to_writer(&mut buf, alert)?;
            buf.push(b'\n');
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(delivery_error)?;
        file.write_all(&buf).await.map_err(delivery_error)?;
        file.flush().await.map_err(delivery_error)?;

        tracing::debug!(
            path = %self.path.display(),
            count = alerts.len(),
            stage = %env.stage,
            "alerts appended"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use streamalert_core::environment::Stage;
    use streamalert_core::types::Severity;

    fn env() -> EnvironmentDescriptor {
        EnvironmentDescriptor {
            stage: Stage::Production,
            region: "us-east-1".to_owned(),
            account_id: "123456789012".to_owned(),
            function_name: "rule_processor".to_owned(),
        }
    }

    fn alert(rule: &str) -> Alert {
        Alert {
            id: format!("id-{rule}"),
            rule_name: rule.to_owned(),
            title: "title".to_owned(),
            description: String::new(),
            severity: Severity::High,
            log_source: "osquery".to_owned(),
            log_type: "json".to_owned(),
            source_service: "kinesis".to_owned(),
            source_entity: "prod_stream".to_owned(),
            record: json!({"name": "root"}),
            tags: vec![],
            created_at: SystemTime::now(),
        }
    }

    #[tokio::test]
    async fn channel_sink_forwards_batch() {
        let (sink, mut rx) = ChannelSink::channel(4);
        sink.deliver(&[alert("a"), alert("b")], &env()).await.unwrap();

        let batch = rx.recv().await.unwrap();
        assert_eq!(batch.alerts.len(), 2);
        assert_eq!(batch.alerts[0].rule_name, "a");
        assert_eq!(batch.environment.stage, Stage::Production);
    }

    #[tokio::test]
    async fn channel_sink_closed_is_delivery_error() {
        let (sink, rx) = ChannelSink::channel(1);
        drop(rx);
        let err = sink.deliver(&[alert("a")], &env()).await.unwrap_err();
        assert!(matches!(err, RuleProcessorError::Delivery(_)));
    }

    #[tokio::test]
    async fn jsonl_sink_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonLinesSink::new(dir.path().join("alerts.jsonl"));

        sink.deliver(&[alert("a")], &env()).await.unwrap();
        sink.deliver(&[alert("b"), alert("c")], &env()).await.unwrap();

        let content = std::fs::read_to_string(sink.path()).unwrap();
        let rules: Vec<String> = content
            .lines()
            .map(|l| serde_json::from_str::<Alert>(l).unwrap().rule_name)
            .collect();
        assert_eq!(rules, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn jsonl_sink_unwritable_path_fails() {
        let sink = JsonLinesSink::new("/nonexistent/dir/alerts.jsonl");
        assert!(sink.deliver(&[alert("a")], &env()).await.is_err());
    }
}
