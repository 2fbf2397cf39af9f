//! 페이로드 -- 파이프라인을 흐르는 데이터 단위와 분류 상태
//!
//! [`Payload`]는 원시 레코드 하나마다 생성됩니다. 소스 판별 결과(`service`, `entity`,
//! `valid_source`)는 추출 전에 한 번 정해지고, 분류 결과(`valid`, `log_source`,
//! `records` 등)는 추출된 데이터 단위마다 [`Payload::reset`] 후 다시 계산됩니다.

use std::fmt;

use serde_json::Value;

use streamalert_core::config::ParserKind;

/// 파싱된 레코드 (필드명 -> 값)
pub type Record = serde_json::Map<String, Value>;

/// 수집 서비스 종류
///
/// 디스패처는 이 열거형에 대해 exhaustive match로 추출 전략을 선택합니다.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ServiceKind {
    /// 아카이브 배치 (S3 객체)
    S3,
    /// 단일 이벤트 스트림 (Kinesis)
    Kinesis,
    /// 알림 봉투 (SNS 메시지)
    Sns,
    /// 설정에는 있을 수 있지만 추출 전략이 없는 서비스
    Other(String),
}

impl ServiceKind {
    /// 설정의 `[sources.<service>]` 키와 같은 서비스 이름
    pub fn as_str(&self) -> &str {
        match self {
            Self::S3 => "s3",
            Self::Kinesis => "kinesis",
            Self::Sns => "sns",
            Self::Other(name) => name,
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 파이프라인을 흐르는 데이터 단위
#[derive(Debug, Clone)]
pub struct Payload {
    /// 수집 계층이 전달한 원시 레코드
    pub raw_record: Value,
    /// 판별된 서비스 (판별 불가 시 None)
    pub service: Option<ServiceKind>,
    /// 서비스 내 엔티티 (스트림/버킷/토픽 이름)
    pub entity: String,
    /// 설정에 등록된 소스인지 여부
    pub valid_source: bool,
    /// 현재 데이터 단위가 분류/파싱에 성공했는지 여부
    pub valid: bool,
    /// 현재 데이터 단위
    pub data: Option<String>,
    /// 분류된 로그 타입
    pub log_source: Option<String>,
    /// 분류에 사용된 파서
    pub log_type: Option<ParserKind>,
    /// 파싱된 레코드
    pub records: Vec<Record>,
}

impl Payload {
    /// 원시 레코드로 새 페이로드를 생성합니다. 소스는 아직 판별되지 않은 상태입니다.
    pub fn new(raw_record: Value) -> Self {
        Self {
            raw_record,
            service: None,
            entity: String::new(),
            valid_source: false,
            valid: false,
            data: None,
            log_source: None,
            log_type: None,
            records: Vec::new(),
        }
    }

    /// 새 데이터 단위로 페이로드를 갱신합니다.
    ///
    /// 분류에서 파생된 필드(`valid`, `log_source`, `log_type`, `records`)를 모두 지운 뒤
    /// `data`를 설정합니다. 소스 판별 결과는 유지됩니다.
    pub fn reset(&mut self, data: &str) {
        self.valid = false;
        self.log_source = None;
        self.log_type = None;
        self.records.clear();
        self.data = Some(data.to_owned());
    }

    /// 서비스 이름 (판별 불가 시 "unknown")
    pub fn service_name(&self) -> &str {
        self.service.as_ref().map_or("unknown", ServiceKind::as_str)
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<Payload valid:{} service:{} entity:{} log_source:{} type:{} data:{:?}>",
            self.valid,
            self.service_name(),
            self.entity,
            self.log_source.as_deref().unwrap_or("none"),
            self.log_type.map_or("none", |t| t.as_str()),
            self.data.as_deref().unwrap_or(""),
        )
    }
}
