//! 프로빙 결정
//!
//! 집계 결과와 대역폭 추정치를 비교해 이번 틱의 동작을 고름
//! - 아무것도 안 함
//! - 실제 할당 증가 (추정치가 최적 수요를 이미 덮음)
//! - 제한된 양의 패딩 주입
//!
//! 매 틱 처음부터 결정함 (스무딩 / 히스테리시스 없음)

use tracing::debug;

use crate::{BitrateSummary, ProbingConfig};

/// 아무것도 하지 않는 이유
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleReason {
    /// 대상 목록이 비어 있음
    NoTargets,

    /// 현재 비트레이트가 이미 최적 이상
    NothingNeeded,

    /// 추정치에 여유가 없음
    NoHeadroom,

    /// 틱당 바이트 예산이 1 미만
    BudgetTooSmall,
}

/// 패딩 계획
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaddingPlan {
    /// 최적까지 부족한 양 (bps)
    pub needed_bps: u64,

    /// 추정치 기준 최대 패딩 (bps)
    pub max_padding_bps: u64,

    /// 실제 패딩 비트레이트 (bps)
    pub padding_bps: u64,

    /// 대역폭 추정치 (bps)
    pub bwe_bps: u64,

    /// 이번 틱 바이트 예산
    pub bytes: u64,
}

/// 틱 결정
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeDecision {
    Idle(IdleReason),

    /// 컨트롤러에 추정치 전체로 재할당 요청
    UpdateAllocation { bwe_bps: u64 },

    Pad(PaddingPlan),
}

impl ProbeDecision {
    /// 결정
    ///
    /// `estimate`는 부족분이 있을 때만 한 번 호출됨
    pub fn decide(
        summary: &BitrateSummary,
        estimate: impl FnOnce() -> u64,
        config: &ProbingConfig,
    ) -> Self {
        let needed_bps = summary.needed_bps();
        if needed_bps < 1 {
            return ProbeDecision::Idle(IdleReason::NothingNeeded);
        }

        let bwe_bps = estimate();

        if summary.total_optimal_bps <= bwe_bps {
            // 최적 비트레이트가 추정치 안에 들어오면 패딩 대신 할당을 늘림
            return ProbeDecision::UpdateAllocation { bwe_bps };
        }

        // 음수 여유는 0으로 취급
        let max_padding_bps = bwe_bps.saturating_sub(summary.total_current_bps);
        let padding_bps = needed_bps.min(max_padding_bps);

        debug!(
            "padding: padding_bps={}, optimal_bps={}, current_bps={}, needed_bps={}, max_padding_bps={}, bwe_bps={}",
            padding_bps,
            summary.total_optimal_bps,
            summary.total_current_bps,
            needed_bps,
            max_padding_bps,
            bwe_bps
        );

        if padding_bps < 1 {
            return ProbeDecision::Idle(IdleReason::NoHeadroom);
        }

        let bytes = config.byte_budget(padding_bps);
        if bytes < 1 {
            return ProbeDecision::Idle(IdleReason::BudgetTooSmall);
        }

        ProbeDecision::Pad(PaddingPlan {
            needed_bps,
            max_padding_bps,
            padding_bps,
            bwe_bps,
            bytes,
        })
    }
}
