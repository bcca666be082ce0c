//! 필러 패킷 생성기
//!
//! 엔진 자신의 SSRC로 내용 없는 RTP 패킷을 만듦
//! - 시퀀스 번호: 생성 시 랜덤, 패킷마다 +1 (wrapping)
//! - 타임스탬프: 생성 시 랜덤, 필러를 보내는 틱마다 고정값만큼 증가
//!
//! 상태는 엔진 인스턴스 하나가 독점하며 되돌리거나 공유하지 않음

use rand::Rng;

use crate::{ProbingConfig, RtpPacket, Ssrc};

/// 필러 패킷 생성기
#[derive(Debug)]
pub struct FillerSynthesizer {
    /// 다음 패킷 시퀀스 번호
    sequence_number: u16,

    /// 마지막으로 사용한 타임스탬프
    timestamp: u32,

    /// 틱당 타임스탬프 증가량
    timestamp_step: u32,

    /// 페이로드 타입
    payload_type: u8,

    /// 패킷 전체 길이
    packet_len: usize,
}

impl FillerSynthesizer {
    /// 랜덤 초기 상태로 생성
    pub fn new(config: &ProbingConfig) -> Self {
        let mut rng = rand::thread_rng();
        Self::with_state(config, rng.gen(), rng.gen())
    }

    /// 초기 시퀀스 번호와 타임스탬프 지정
    pub fn with_state(config: &ProbingConfig, sequence_number: u16, timestamp: u32) -> Self {
        Self {
            sequence_number,
            timestamp,
            timestamp_step: config.timestamp_step,
            payload_type: config.filler_payload_type,
            packet_len: config.filler_packet_len(),
        }
    }

    /// 다음 패킷에 쓸 시퀀스 번호
    pub fn sequence_number(&self) -> u16 {
        self.sequence_number
    }

    /// 마지막 타임스탬프
    pub fn timestamp(&self) -> u32 {
        self.timestamp
    }

    pub fn packet_len(&self) -> usize {
        self.packet_len
    }

    /// 예산에 대한 패킷 수
    ///
    /// 나머지를 버리지 않도록 항상 하나를 더 보냄 (예산을 약간 초과)
    pub fn packet_count(&self, budget: usize) -> usize {
        budget / self.packet_len + 1
    }

    /// 한 틱 분량의 필러 패킷 생성
    ///
    /// 타임스탬프는 여기서 한 번만 증가하고 모든 패킷이 같은 값을 씀.
    /// 패킷은 꺼낼 때마다 하나씩 만들어지며 시퀀스 번호도 그때 소비됨
    pub fn next_batch(&mut self, ssrc: Ssrc, budget: usize) -> FillerBatch<'_> {
        self.timestamp = self.timestamp.wrapping_add(self.timestamp_step);

        let remaining = self.packet_count(budget);
        FillerBatch {
            synthesizer: self,
            ssrc,
            remaining,
        }
    }
}

/// 한 틱 분량의 필러 패킷 (지연 생성)
#[derive(Debug)]
pub struct FillerBatch<'a> {
    synthesizer: &'a mut FillerSynthesizer,
    ssrc: Ssrc,
    remaining: usize,
}

impl Iterator for FillerBatch<'_> {
    type Item = RtpPacket;

    fn next(&mut self) -> Option<RtpPacket> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let filler = &mut *self.synthesizer;
        let packet = RtpPacket::filler(
            self.ssrc,
            filler.payload_type,
            filler.sequence_number,
            filler.timestamp,
            filler.packet_len,
        );
        filler.sequence_number = filler.sequence_number.wrapping_add(1);

        Some(packet)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for FillerBatch<'_> {}
