//! 프로빙 설정

use std::time::Duration;

use crate::{Error, Result, RTP_FIXED_HEADER_SIZE};

/// 기본 프로빙 주기 (밀리초)
pub const DEFAULT_PADDING_PERIOD_MS: u64 = 15;

/// 필러를 보낸 틱당 RTP 타임스탬프 증가량 (90kHz 기준 약 33ms)
pub const DEFAULT_TIMESTAMP_STEP: u32 = 3000;

/// 필러 패킷 페이로드 타입 (VP8 자리표시)
pub const DEFAULT_FILLER_PAYLOAD_TYPE: u8 = 100;

/// 필러 패킷 페이로드 길이 (바이트)
pub const DEFAULT_FILLER_PAYLOAD_LEN: usize = 0xFF;

/// 틱당 바이트 예산 상한 (부호 있는 32비트 범위)
pub const MAX_BYTE_BUDGET: u64 = i32::MAX as u64;

/// 프로빙 엔진 설정
#[derive(Debug, Clone)]
pub struct ProbingConfig {
    /// 틱 주기 (밀리초)
    /// 바이트 예산 계산에도 같은 값을 사용
    pub padding_period_ms: u64,

    /// 필러를 보낸 틱마다 더하는 타임스탬프 값
    /// 틱 주기와 무관한 고정값 (수신측 클럭 레이트 기준)
    pub timestamp_step: u32,

    /// 필러 패킷 페이로드 타입
    pub filler_payload_type: u8,

    /// 필러 패킷 페이로드 길이 (RTP 헤더 제외)
    pub filler_payload_len: usize,
}

impl Default for ProbingConfig {
    fn default() -> Self {
        Self {
            padding_period_ms: DEFAULT_PADDING_PERIOD_MS,
            timestamp_step: DEFAULT_TIMESTAMP_STEP,
            filler_payload_type: DEFAULT_FILLER_PAYLOAD_TYPE,
            filler_payload_len: DEFAULT_FILLER_PAYLOAD_LEN,
        }
    }
}

impl ProbingConfig {
    /// 새 설정 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 짧은 주기 설정 (더 잦고 작은 버스트)
    pub fn low_latency() -> Self {
        Self {
            padding_period_ms: 10,
            ..Self::default()
        }
    }

    /// 긴 주기 설정 (타이머 부하 감소)
    pub fn relaxed() -> Self {
        Self {
            padding_period_ms: 20,
            ..Self::default()
        }
    }

    /// 틱 주기
    pub fn padding_period(&self) -> Duration {
        Duration::from_millis(self.padding_period_ms)
    }

    /// 필러 패킷 전체 길이 (헤더 + 페이로드)
    pub fn filler_packet_len(&self) -> usize {
        RTP_FIXED_HEADER_SIZE + self.filler_payload_len
    }

    /// 한 틱 동안 `padding_bps`로 보낼 수 있는 바이트 수
    ///
    /// 결과는 `MAX_BYTE_BUDGET` 이하
    pub fn byte_budget(&self, padding_bps: u64) -> u64 {
        (self.padding_period_ms.saturating_mul(padding_bps) / 1000 / 8).min(MAX_BYTE_BUDGET)
    }

    /// 설정 검증
    pub fn validate(&self) -> Result<()> {
        if self.padding_period_ms == 0 {
            return Err(Error::InvalidConfig("padding_period_ms는 0보다 커야 함".into()));
        }
        if self.filler_payload_type > 0x7F {
            return Err(Error::InvalidConfig(format!(
                "payload type {} 은 7비트를 초과함",
                self.filler_payload_type
            )));
        }
        if self.filler_payload_len == 0 {
            return Err(Error::InvalidConfig("filler_payload_len은 0보다 커야 함".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ProbingConfig::default();
        assert_eq!(config.padding_period(), Duration::from_millis(15));
        assert_eq!(config.filler_packet_len(), 12 + 255);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_byte_budget_floors() {
        let config = ProbingConfig::default();
        // 15 * 80000 / 1000 / 8 = 150
        assert_eq!(config.byte_budget(80_000), 150);
        // 15 * 500 / 1000 = 7 -> 7 / 8 = 0
        assert_eq!(config.byte_budget(500), 0);
        assert_eq!(config.byte_budget(0), 0);
    }

    #[test]
    fn test_byte_budget_capped() {
        let config = ProbingConfig::relaxed();
        assert_eq!(config.byte_budget(u64::MAX), MAX_BYTE_BUDGET);
        // 20ms * 100Gbps / 8 = 250MB 는 상한 안쪽
        assert_eq!(config.byte_budget(100_000_000_000), 250_000_000);
    }

    #[test]
    fn test_invalid_config() {
        let mut config = ProbingConfig::low_latency();
        config.filler_payload_type = 200;
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        let config = ProbingConfig {
            padding_period_ms: 0,
            ..ProbingConfig::relaxed()
        };
        assert!(config.validate().is_err());
    }
}
