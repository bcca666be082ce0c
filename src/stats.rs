//! 프로빙 통계

use std::time::{Duration, Instant};

/// 엔진 누적 통계
#[derive(Debug, Clone)]
pub struct ProbingStats {
    /// 시작 시간
    pub start_time: Instant,

    /// 마지막 틱 시간
    pub last_tick: Option<Instant>,

    /// 총 틱 수
    pub ticks: u64,

    /// 아무것도 하지 않은 틱 수
    pub idle_ticks: u64,

    /// 할당 재계산 요청 수
    pub allocation_updates: u64,

    /// 스트림 보호 패딩 요청 바이트
    pub protection_bytes_requested: u64,

    /// 스트림 보호 패딩으로 소비된 바이트
    pub protection_bytes_spent: u64,

    /// 필러를 보낸 틱 수
    pub filler_ticks: u64,

    /// 주입 성공한 필러 패킷 수
    pub filler_packets: u64,

    /// 주입 성공한 필러 바이트
    pub filler_bytes: u64,

    /// 주입 실패 수
    pub injection_failures: u64,

    /// 송신 SSRC를 못 찾아 필러를 포기한 틱 수
    pub unresolved_sender_ticks: u64,
}

impl ProbingStats {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            last_tick: None,
            ticks: 0,
            idle_ticks: 0,
            allocation_updates: 0,
            protection_bytes_requested: 0,
            protection_bytes_spent: 0,
            filler_ticks: 0,
            filler_packets: 0,
            filler_bytes: 0,
            injection_failures: 0,
            unresolved_sender_ticks: 0,
        }
    }

    /// 경과 시간
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// 전체 프로빙 바이트 (보호 패딩 + 필러)
    pub fn total_probe_bytes(&self) -> u64 {
        self.protection_bytes_spent + self.filler_bytes
    }

    /// 평균 프로빙 비트레이트 (bps)
    pub fn average_probe_bps(&self) -> f64 {
        let elapsed = self.elapsed().as_secs_f64();
        if elapsed == 0.0 {
            return 0.0;
        }
        self.total_probe_bytes() as f64 * 8.0 / elapsed
    }

    /// 통계 요약 문자열
    pub fn summary(&self) -> String {
        format!(
            "Elapsed: {:.2}s | Ticks: {} (idle {}) | Alloc updates: {} | Protection: {}/{} B | Filler: {} pkts, {} B | Failures: {} | Probe: {:.1} kbps",
            self.elapsed().as_secs_f64(),
            self.ticks,
            self.idle_ticks,
            self.allocation_updates,
            self.protection_bytes_spent,
            self.protection_bytes_requested,
            self.filler_packets,
            self.filler_bytes,
            self.injection_failures,
            self.average_probe_bps() / 1000.0,
        )
    }
}

impl Default for ProbingStats {
    fn default() -> Self {
        Self::new()
    }
}
