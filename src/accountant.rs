//! 비트레이트 집계
//!
//! 대상별 스냅샷을 합산하고 보호할 스트림 목록을 만듦

use crate::{PaddingTarget, Ssrc};

/// 한 틱의 비트레이트 합계
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BitrateSummary {
    /// 전송 중인 대상의 현재 비트레이트 합
    pub total_current_bps: u64,

    /// 모든 대상의 최적 비트레이트 합
    pub total_optimal_bps: u64,

    /// 패딩으로 보호할 SSRC (컨트롤러 순서 = 우선순위)
    pub ssrcs_to_protect: Vec<Ssrc>,
}

impl BitrateSummary {
    /// 대상 목록 집계
    ///
    /// 목록이 비어 있으면 None (이번 틱은 할 일 없음)
    pub fn from_targets(targets: &[PaddingTarget]) -> Option<Self> {
        if targets.is_empty() {
            return None;
        }

        let mut summary = Self::default();
        for target in targets {
            let bitrates = target.bitrates;

            // 전송 중이 아닌 스트림은 보호하지 않음
            if bitrates.is_streaming() {
                summary.total_current_bps =
                    summary.total_current_bps.saturating_add(bitrates.current_bps);
                if let Some(ssrc) = target.target_ssrc {
                    summary.ssrcs_to_protect.push(ssrc);
                }
            }

            summary.total_optimal_bps =
                summary.total_optimal_bps.saturating_add(bitrates.optimal_bps);
        }

        Some(summary)
    }

    /// 최적 비트레이트까지 부족한 양 (bps)
    pub fn needed_bps(&self) -> u64 {
        self.total_optimal_bps.saturating_sub(self.total_current_bps)
    }
}
