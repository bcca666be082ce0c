//! 에러 타입 정의

use thiserror::Error;

use crate::Ssrc;

/// 프로빙 엔진 에러 타입
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO 에러: {0}")]
    Io(#[from] std::io::Error),

    #[error("직렬화 에러: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("패킷 전송 실패: ssrc={ssrc}, seq={sequence_number}: {reason}")]
    TransmissionFailed {
        ssrc: Ssrc,
        sequence_number: u16,
        reason: String,
    },

    #[error("로컬 송신 SSRC를 확인할 수 없음")]
    SenderSsrcUnresolved,

    #[error("RTP 패킷이 너무 짧음: {len} 바이트")]
    PacketTooShort { len: usize },

    #[error("유효하지 않은 RTP 버전: expected 2, got {got}")]
    InvalidRtpVersion { got: u8 },

    #[error("유효하지 않은 매직 넘버: expected {expected:08X}, got {got:08X}")]
    InvalidMagicNumber { expected: u32, got: u32 },

    #[error("유효하지 않은 프로토콜 버전: expected {expected}, got {got}")]
    InvalidVersion { expected: u8, got: u8 },

    #[error("리포트 페이로드 잘림: expected {expected} 바이트, got {got}")]
    TruncatedReport { expected: usize, got: usize },

    #[error("태스크 종료 에러: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("유효하지 않은 설정: {0}")]
    InvalidConfig(String),
}

/// Result 타입 별칭
pub type Result<T> = std::result::Result<T, Error>;
