//! 대역폭 프로빙 엔진
//!
//! 틱마다:
//! 1. 대상 비트레이트 집계
//! 2. 할당 증가 / 패딩 / 무동작 결정
//! 3. 보호할 스트림의 RTX 채널로 패딩 (우선순위 순서)
//! 4. 남은 예산은 엔진 SSRC의 필러 패킷으로 채움
//!
//! ## 호출 규약
//! `run_once`는 `&mut self`를 받으므로 한 인스턴스의 틱은 겹칠 수 없음.
//! 스케줄러는 이전 틱이 끝난 뒤에만 다음 틱을 호출해야 하며 엔진 내부에는
//! 락이 없음

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::channel::{Plane, ProbeChannel};
use crate::decision::{IdleReason, PaddingPlan, ProbeDecision};
use crate::filler::FillerSynthesizer;
use crate::stats::ProbingStats;
use crate::{BitrateSummary, Error, ProbingConfig, Result};

/// 필러 전송 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillReport {
    /// 보호 패딩으로 소비된 바이트
    pub protection_bytes: usize,

    /// 필러 예산 (보호 패딩 후 남은 바이트)
    pub filler_budget: usize,

    /// 주입 성공 패킷 수
    pub packets_sent: usize,

    /// 주입 실패 패킷 수
    pub packets_failed: usize,
}

/// 틱 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Idle(IdleReason),

    /// 컨트롤러에 재할당 요청함
    AllocationUpdated { bwe_bps: u64 },

    /// 스트림 보호 패딩이 예산을 모두 소비함
    Protected { protection_bytes: usize },

    /// 필러 패킷 전송
    Filled(FillReport),
}

/// 대역폭 프로빙 엔진 (하향 채널 하나당 하나)
pub struct BandwidthProbing<C: ProbeChannel> {
    /// 대상 채널
    channel: Arc<C>,

    /// 설정
    config: ProbingConfig,

    /// 필러 생성기 (시퀀스 / 타임스탬프 상태)
    filler: FillerSynthesizer,

    /// 누적 통계
    stats: ProbingStats,
}

impl<C: ProbeChannel> BandwidthProbing<C> {
    /// 새 엔진 생성
    pub fn new(channel: Arc<C>, config: ProbingConfig) -> Result<Self> {
        config.validate()?;
        let filler = FillerSynthesizer::new(&config);
        Ok(Self::with_filler(channel, config, filler))
    }

    /// 필러 상태를 지정해 생성
    pub fn with_filler(channel: Arc<C>, config: ProbingConfig, filler: FillerSynthesizer) -> Self {
        Self {
            channel,
            config,
            filler,
            stats: ProbingStats::new(),
        }
    }

    /// 틱 주기
    pub fn period(&self) -> Duration {
        self.config.padding_period()
    }

    pub fn channel(&self) -> &Arc<C> {
        &self.channel
    }

    pub fn config(&self) -> &ProbingConfig {
        &self.config
    }

    pub fn filler(&self) -> &FillerSynthesizer {
        &self.filler
    }

    /// 누적 통계
    pub fn stats(&self) -> &ProbingStats {
        &self.stats
    }

    /// 틱 한 번 실행
    ///
    /// 송신 SSRC를 확인할 수 없으면 이번 틱의 필러만 포기하고
    /// `Error::SenderSsrcUnresolved`를 반환함. 다음 틱에 다시 시도됨
    pub fn run_once(&mut self) -> Result<TickOutcome> {
        self.stats.ticks += 1;
        self.stats.last_tick = Some(Instant::now());

        let targets = self.channel.padding_targets();
        let summary = match BitrateSummary::from_targets(&targets) {
            Some(summary) => summary,
            None => return Ok(self.idle(IdleReason::NoTargets)),
        };

        let channel = &self.channel;
        let decision =
            ProbeDecision::decide(&summary, || channel.latest_estimate(), &self.config);

        match decision {
            ProbeDecision::Idle(reason) => Ok(self.idle(reason)),
            ProbeDecision::UpdateAllocation { bwe_bps } => {
                debug!("추정치가 최적 비트레이트를 덮음, 할당 갱신: bwe_bps={}", bwe_bps);
                self.channel.update_allocation(None, bwe_bps);
                self.stats.allocation_updates += 1;
                Ok(TickOutcome::AllocationUpdated { bwe_bps })
            }
            ProbeDecision::Pad(plan) => self.pad(&summary, &plan),
        }
    }

    fn idle(&mut self, reason: IdleReason) -> TickOutcome {
        self.stats.idle_ticks += 1;
        TickOutcome::Idle(reason)
    }

    /// 스트림 보호 후 남은 예산을 필러로 채움
    fn pad(&mut self, summary: &BitrateSummary, plan: &PaddingPlan) -> Result<TickOutcome> {
        let mut bytes = usize::try_from(plan.bytes).unwrap_or(usize::MAX);
        let mut protection_bytes = 0usize;

        for &ssrc in &summary.ssrcs_to_protect {
            let remaining = self.channel.send_protection_padding(ssrc, bytes);
            let spent = bytes.saturating_sub(remaining);

            self.stats.protection_bytes_requested += bytes as u64;
            self.stats.protection_bytes_spent += spent as u64;
            protection_bytes += spent;
            bytes = remaining;

            if bytes < 1 {
                return Ok(TickOutcome::Protected { protection_bytes });
            }
        }

        let ssrc = match self.channel.local_ssrc() {
            Some(ssrc) => ssrc,
            None => {
                self.stats.unresolved_sender_ticks += 1;
                return Err(Error::SenderSsrcUnresolved);
            }
        };

        let packets = self.filler.next_batch(ssrc, bytes);
        let mut report = FillReport {
            protection_bytes,
            filler_budget: bytes,
            packets_sent: 0,
            packets_failed: 0,
        };

        for packet in packets {
            let len = packet.len();
            match self.channel.inject_packet(packet, Plane::Data) {
                Ok(()) => {
                    report.packets_sent += 1;
                    self.stats.filler_packets += 1;
                    self.stats.filler_bytes += len as u64;
                }
                Err(e) => {
                    warn!("필러 패킷 전송 실패: {}", e);
                    report.packets_failed += 1;
                    self.stats.injection_failures += 1;
                }
            }
        }

        self.stats.filler_ticks += 1;
        debug!(
            "필러 전송: ssrc={}, budget={}, sent={}, failed={}",
            ssrc, bytes, report.packets_sent, report.packets_failed
        );

        Ok(TickOutcome::Filled(report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PaddingTarget, RtpPacket, Ssrc};
    use parking_lot::Mutex;

    /// 호출을 기록하는 최소 채널
    #[derive(Default)]
    struct FixedChannel {
        targets: Vec<PaddingTarget>,
        estimate: u64,
        local_ssrc: Option<Ssrc>,
        injected: Mutex<Vec<RtpPacket>>,
        updates: Mutex<Vec<(Option<Ssrc>, u64)>>,
    }

    impl ProbeChannel for FixedChannel {
        fn padding_targets(&self) -> Vec<PaddingTarget> {
            self.targets.clone()
        }

        fn latest_estimate(&self) -> u64 {
            self.estimate
        }

        fn update_allocation(&self, target: Option<Ssrc>, bandwidth_bps: u64) {
            self.updates.lock().push((target, bandwidth_bps));
        }

        fn send_protection_padding(&self, _ssrc: Ssrc, bytes: usize) -> usize {
            bytes
        }

        fn inject_packet(&self, packet: RtpPacket, _plane: Plane) -> Result<()> {
            self.injected.lock().push(packet);
            Ok(())
        }

        fn local_ssrc(&self) -> Option<Ssrc> {
            self.local_ssrc
        }
    }

    fn engine(channel: FixedChannel) -> BandwidthProbing<FixedChannel> {
        let config = ProbingConfig::default();
        let filler = FillerSynthesizer::with_state(&config, 10, 0);
        BandwidthProbing::with_filler(Arc::new(channel), config, filler)
    }

    #[test]
    fn test_no_targets() {
        let mut probing = engine(FixedChannel::default());
        assert_eq!(
            probing.run_once().unwrap(),
            TickOutcome::Idle(IdleReason::NoTargets)
        );
        assert_eq!(probing.stats().idle_ticks, 1);
    }

    #[test]
    fn test_allocation_update() {
        let mut probing = engine(FixedChannel {
            targets: vec![PaddingTarget::new(Some(1), 100_000, 300_000)],
            estimate: 1_000_000,
            ..Default::default()
        });

        assert_eq!(
            probing.run_once().unwrap(),
            TickOutcome::AllocationUpdated { bwe_bps: 1_000_000 }
        );
        assert_eq!(*probing.channel().updates.lock(), vec![(None, 1_000_000)]);
        assert!(probing.channel().injected.lock().is_empty());
    }

    #[test]
    fn test_filler_when_protection_leaves_budget() {
        // 15ms * 800kbps / 8 = 1500 바이트 -> 1500 / 267 + 1 = 6 패킷
        let mut probing = engine(FixedChannel {
            targets: vec![PaddingTarget::new(Some(1), 200_000, 2_000_000)],
            estimate: 1_000_000,
            local_ssrc: Some(0xABCD),
            ..Default::default()
        });

        let TickOutcome::Filled(report) = probing.run_once().unwrap() else {
            panic!("expected filler");
        };
        assert_eq!(report.filler_budget, 1500);
        assert_eq!(report.packets_sent, 6);
        assert_eq!(report.protection_bytes, 0);
        assert_eq!(probing.filler().sequence_number(), 16);
        assert_eq!(probing.filler().timestamp(), 3000);
        assert_eq!(probing.stats().filler_bytes, 6 * 267);
    }

    #[test]
    fn test_unresolved_sender() {
        let mut probing = engine(FixedChannel {
            targets: vec![PaddingTarget::new(None, 200_000, 2_000_000)],
            estimate: 1_000_000,
            local_ssrc: None,
            ..Default::default()
        });

        assert!(matches!(
            probing.run_once(),
            Err(Error::SenderSsrcUnresolved)
        ));
        assert_eq!(probing.filler().timestamp(), 0);
        assert_eq!(probing.filler().sequence_number(), 10);
        assert_eq!(probing.stats().unresolved_sender_ticks, 1);
        assert!(probing.channel().injected.lock().is_empty());
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = ProbingConfig {
            padding_period_ms: 0,
            ..ProbingConfig::default()
        };
        let result = BandwidthProbing::new(Arc::new(FixedChannel::default()), config);
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }
}
