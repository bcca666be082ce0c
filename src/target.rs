//! 패딩 대상 정의
//!
//! 할당 컨트롤러가 매 틱 새로 넘겨주는 스냅샷. 엔진은 읽기만 함

use crate::Ssrc;

/// 대상 하나의 비트레이트 스냅샷
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Bitrates {
    /// 현재 실제로 보내고 있는 비트레이트 (bps)
    pub current_bps: u64,

    /// 대역폭 제약이 없을 때 쓰려는 비트레이트 (bps)
    pub optimal_bps: u64,
}

impl Bitrates {
    pub fn new(current_bps: u64, optimal_bps: u64) -> Self {
        Self {
            current_bps,
            optimal_bps,
        }
    }

    /// 현재 전송 중인지
    pub fn is_streaming(&self) -> bool {
        self.current_bps > 0
    }
}

/// 패딩 대상 (컨트롤러가 추적하는 미디어 대상 하나)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaddingTarget {
    /// 보호할 스트림 SSRC (None이면 보호할 특정 스트림 없음)
    pub target_ssrc: Option<Ssrc>,

    /// 비트레이트
    pub bitrates: Bitrates,
}

impl PaddingTarget {
    pub fn new(target_ssrc: Option<Ssrc>, current_bps: u64, optimal_bps: u64) -> Self {
        Self {
            target_ssrc,
            bitrates: Bitrates::new(current_bps, optimal_bps),
        }
    }
}
