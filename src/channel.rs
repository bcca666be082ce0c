//! 협력자 인터페이스
//!
//! 엔진 하나는 하향 채널(수신자) 하나에 묶임. 추정기, 할당 컨트롤러,
//! RTX 송신기, 전송 계층은 모두 이 트레이트 뒤에 있음

use crate::{PaddingTarget, Result, RtpPacket, Ssrc};

/// 패킷 주입 경로
///
/// 엔진이 만드는 패킷은 모두 데이터 경로로 들어감
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plane {
    /// 데이터 패킷과 같은 변환 체인(RTX, SRTP 등)을 통과
    Data,
}

/// 프로빙 대상 채널
///
/// 모든 호출은 동기식이고 짧게 끝나야 함. 엔진은 틱 안에서 블로킹하지 않음
pub trait ProbeChannel: Send + Sync {
    /// 현재 추적 중인 패딩 대상 (컨트롤러 우선순위 순서)
    ///
    /// 대상이 없으면 빈 목록
    fn padding_targets(&self) -> Vec<PaddingTarget>;

    /// 최신 대역폭 추정치 (bps)
    fn latest_estimate(&self) -> u64;

    /// 할당 재계산 요청
    ///
    /// 엔진은 `target`을 항상 None으로, 추정치 전체를 `bandwidth_bps`로 넘김
    fn update_allocation(&self, target: Option<Ssrc>, bandwidth_bps: u64);

    /// 스트림의 RTX 채널로 최대 `bytes`만큼 패딩 전송
    ///
    /// 남은 바이트 예산을 반환
    fn send_protection_padding(&self, ssrc: Ssrc, bytes: usize) -> usize;

    /// 패킷 주입
    fn inject_packet(&self, packet: RtpPacket, plane: Plane) -> Result<()>;

    /// 로컬 송신 SSRC (RTP 세션이 아직 없으면 None)
    fn local_ssrc(&self) -> Option<Ssrc>;
}
