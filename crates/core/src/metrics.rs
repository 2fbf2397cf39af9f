//! 메트릭 상수 및 설명 등록
//!
//! 룰 프로세서가 기록하는 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 호출 측은 이 상수로 `metrics::counter!()` 매크로를 호출합니다.
//! 레코더가 설치되지 않은 환경에서는 기록이 무시됩니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `streamalert_`
//! - 접미어: `_total` (counter)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(streamalert_core::metrics::RECORDS_RECEIVED_TOTAL).increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 수집 서비스 레이블 키 (kinesis, s3, sns)
pub const LABEL_SERVICE: &str = "service";

/// 심각도 레이블 키 (info, low, medium, high, critical)
pub const LABEL_SEVERITY: &str = "severity";

/// 배포 단계 레이블 키 (development, production, ...)
pub const LABEL_STAGE: &str = "stage";

// ─── Rule Processor 메트릭 ─────────────────────────────────────────

/// 배치로 수신된 원시 레코드 수 (counter)
pub const RECORDS_RECEIVED_TOTAL: &str = "streamalert_records_received_total";

/// 미등록 소스로 건너뛴 레코드 수 (counter)
pub const RECORDS_SKIPPED_TOTAL: &str = "streamalert_records_skipped_total";

/// 분류/평가된 데이터 단위 수 (counter, label: service)
pub const DATA_UNITS_PROCESSED_TOTAL: &str = "streamalert_data_units_processed_total";

/// 분류에 실패한 데이터 단위 수 (counter, label: service)
pub const INVALID_DATA_TOTAL: &str = "streamalert_invalid_data_total";

/// 생성된 알림 수 (counter, label: severity)
pub const ALERTS_GENERATED_TOTAL: &str = "streamalert_alerts_generated_total";

/// 외부 싱크 전달 횟수 (counter, label: stage)
pub const ALERT_DELIVERIES_TOTAL: &str = "streamalert_alert_deliveries_total";

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// 전역 레코더 설치 후 한 번만 호출합니다.
pub fn describe_all() {
    use metrics::describe_counter;

    describe_counter!(
        RECORDS_RECEIVED_TOTAL,
        "Total number of raw records received in invocation batches"
    );
    describe_counter!(
        RECORDS_SKIPPED_TOTAL,
        "Total number of raw records skipped because their source is not configured"
    );
    describe_counter!(
        DATA_UNITS_PROCESSED_TOTAL,
        "Total number of extracted data units run through classification"
    );
    describe_counter!(
        INVALID_DATA_TOTAL,
        "Total number of extracted data units that failed classification"
    );
    describe_counter!(
        ALERTS_GENERATED_TOTAL,
        "Total number of alerts generated by rule evaluation"
    );
    describe_counter!(
        ALERT_DELIVERIES_TOTAL,
        "Total number of alert batches handed to an external sink"
    );
}
