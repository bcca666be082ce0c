//! # SFU Probe
//!
//! SFU 하향 링크 대역폭 프로빙 / 패딩 엔진
//!
//! ## 핵심 특징
//! - **비트레이트 집계**: 대상별 현재 / 최적 비트레이트 합산
//! - **프로빙 결정**: 추정치가 충분하면 할당 증가, 아니면 제한된 패딩
//! - **스트림 보호 우선**: 흐르는 스트림의 RTX 채널로 먼저 패딩
//! - **필러 패킷**: 남은 예산은 연속된 시퀀스 / 타임스탬프의 RTP 필러로 채움
//! - **캐시 금지**: 필러는 재전송 버퍼에 들어가지 않음

pub mod accountant;
pub mod channel;
pub mod config;
pub mod decision;
pub mod error;
pub mod filler;
pub mod probing;
pub mod report;
pub mod rtp;
pub mod scheduler;
pub mod stats;
pub mod target;

pub use accountant::BitrateSummary;
pub use channel::{Plane, ProbeChannel};
pub use config::ProbingConfig;
pub use decision::{IdleReason, PaddingPlan, ProbeDecision};
pub use error::{Error, Result};
pub use filler::{FillerBatch, FillerSynthesizer};
pub use probing::{BandwidthProbing, FillReport, TickOutcome};
pub use report::{ReceiveTracker, ReceiverReport};
pub use rtp::RtpPacket;
pub use scheduler::ProbingTask;
pub use stats::ProbingStats;
pub use target::{Bitrates, PaddingTarget};

/// SSRC (RTP 동기화 소스 식별자)
pub type Ssrc = u32;

/// RTP 고정 헤더 크기 (바이트)
pub const RTP_FIXED_HEADER_SIZE: usize = 12;

/// 리포트 프로토콜 버전
pub const PROTOCOL_VERSION: u8 = 1;

/// 매직 넘버 (리포트 식별용)
pub const REPORT_MAGIC: u32 = 0x50524F42; // "PROB"
