//! 수신자 리포트
//!
//! 싱크가 관찰한 수신량을 송신측에 알려줌. 송신측은 이를 대역폭 추정치로 사용
//! 필러 패킷의 시퀀스 / 타임스탬프 연속성도 함께 보고

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Error, Result, RtpPacket, Ssrc, PROTOCOL_VERSION, REPORT_MAGIC};

/// 리포트 헤더
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportHeader {
    /// 매직 넘버
    pub magic: u32,

    /// 프로토콜 버전
    pub version: u8,

    /// 페이로드 길이 (헤더 제외)
    pub payload_len: u32,
}

/// 수신자 리포트 (싱크 → 송신자)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiverReport {
    /// 측정 구간 (밀리초)
    pub interval_ms: u64,

    /// 구간 동안 받은 패킷 수
    pub received_packets: u64,

    /// 구간 동안 받은 바이트
    pub received_bytes: u64,

    /// 구간 동안 받은 필러 패킷 수
    pub filler_packets: u64,

    /// 필러 시퀀스 번호 불연속 횟수 (누적)
    pub sequence_gaps: u64,

    /// 필러 타임스탬프 역행 횟수 (누적)
    pub timestamp_regressions: u64,
}

impl ReceiverReport {
    /// 구간 수신율 (bps)
    pub fn receive_rate_bps(&self) -> u64 {
        if self.interval_ms == 0 {
            return 0;
        }
        self.received_bytes.saturating_mul(8 * 1000) / self.interval_ms
    }

    /// 바이트로 직렬화
    pub fn to_bytes(&self) -> Vec<u8> {
        let payload = bincode::serialize(self).unwrap_or_default();
        let header = ReportHeader {
            magic: REPORT_MAGIC,
            version: PROTOCOL_VERSION,
            payload_len: payload.len() as u32,
        };
        let header_bytes = bincode::serialize(&header).unwrap_or_default();

        let mut buf = Vec::with_capacity(header_bytes.len() + payload.len());
        buf.extend_from_slice(&header_bytes);
        buf.extend_from_slice(&payload);
        buf
    }

    /// 바이트에서 역직렬화
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let header: ReportHeader = bincode::deserialize(bytes)?;
        if header.magic != REPORT_MAGIC {
            return Err(Error::InvalidMagicNumber {
                expected: REPORT_MAGIC,
                got: header.magic,
            });
        }

        if header.version != PROTOCOL_VERSION {
            return Err(Error::InvalidVersion {
                expected: PROTOCOL_VERSION,
                got: header.version,
            });
        }

        // 헤더는 고정 크기 (u32 + u8 + u32)
        let header_size = bincode::serialized_size(&header)? as usize;
        let payload = &bytes[header_size..];
        let payload_len = header.payload_len as usize;
        if payload.len() < payload_len {
            return Err(Error::TruncatedReport {
                expected: payload_len,
                got: payload.len(),
            });
        }

        Ok(bincode::deserialize(&payload[..payload_len])?)
    }
}

/// 필러 스트림 연속성 상태 (SSRC별)
#[derive(Debug, Clone, Copy)]
struct FillerStream {
    next_sequence: u16,
    last_timestamp: u32,
}

/// 수신 추적기
///
/// 필러 패킷은 페이로드 타입으로 구분함
#[derive(Debug)]
pub struct ReceiveTracker {
    /// 필러 페이로드 타입
    filler_payload_type: u8,

    /// SSRC별 필러 상태
    streams: HashMap<Ssrc, FillerStream>,

    /// 현재 구간 리포트
    current: ReceiverReport,
}

impl ReceiveTracker {
    pub fn new(filler_payload_type: u8) -> Self {
        Self {
            filler_payload_type,
            streams: HashMap::new(),
            current: ReceiverReport::default(),
        }
    }

    /// 패킷 수신 기록
    pub fn on_packet(&mut self, packet: &RtpPacket) {
        self.current.received_packets += 1;
        self.current.received_bytes += packet.len() as u64;

        if packet.payload_type != self.filler_payload_type {
            return;
        }
        self.current.filler_packets += 1;

        let stream = FillerStream {
            next_sequence: packet.sequence_number.wrapping_add(1),
            last_timestamp: packet.timestamp,
        };

        if let Some(prev) = self.streams.insert(packet.ssrc, stream) {
            if packet.sequence_number != prev.next_sequence {
                self.current.sequence_gaps += 1;
            }
            if (packet.timestamp.wrapping_sub(prev.last_timestamp) as i32) < 0 {
                self.current.timestamp_regressions += 1;
            }
        }
    }

    /// 현재 구간 리포트를 꺼내고 구간 카운터 초기화
    ///
    /// 연속성 카운터는 누적값 유지
    pub fn take_report(&mut self, interval: Duration) -> ReceiverReport {
        let mut report = std::mem::take(&mut self.current);
        report.interval_ms = interval.as_millis() as u64;

        self.current.sequence_gaps = report.sequence_gaps;
        self.current.timestamp_regressions = report.timestamp_regressions;

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_serialization() {
        let report = ReceiverReport {
            interval_ms: 200,
            received_packets: 40,
            received_bytes: 25_000,
            filler_packets: 12,
            sequence_gaps: 1,
            timestamp_regressions: 0,
        };

        let restored = ReceiverReport::from_bytes(&report.to_bytes()).unwrap();
        assert_eq!(report, restored);
        assert_eq!(restored.receive_rate_bps(), 1_000_000);
    }

    #[test]
    fn test_report_rejects_wrong_magic() {
        let mut bytes = ReceiverReport::default().to_bytes();
        bytes[0] ^= 0xFF;
        assert!(matches!(
            ReceiverReport::from_bytes(&bytes),
            Err(Error::InvalidMagicNumber { .. })
        ));
    }

    #[test]
    fn test_report_rejects_other_version() {
        let mut bytes = ReceiverReport::default().to_bytes();
        // magic(4) 다음 바이트가 버전
        bytes[4] = PROTOCOL_VERSION + 1;
        assert!(matches!(
            ReceiverReport::from_bytes(&bytes),
            Err(Error::InvalidVersion { expected: PROTOCOL_VERSION, got }) if got == PROTOCOL_VERSION + 1
        ));
    }

    #[test]
    fn test_report_rejects_truncated_payload() {
        let report = ReceiverReport {
            interval_ms: 200,
            received_bytes: 4096,
            ..Default::default()
        };
        let mut bytes = report.to_bytes();
        bytes.pop();

        assert!(matches!(
            ReceiverReport::from_bytes(&bytes),
            Err(Error::TruncatedReport { expected: 48, got: 47 })
        ));
    }

    #[test]
    fn test_report_ignores_trailing_bytes() {
        let report = ReceiverReport {
            interval_ms: 100,
            received_packets: 3,
            ..Default::default()
        };
        let mut bytes = report.to_bytes();
        bytes.extend_from_slice(&[0xAA; 8]);

        assert_eq!(ReceiverReport::from_bytes(&bytes).unwrap(), report);
    }

    #[test]
    fn test_tracker_detects_gaps_and_regressions() {
        let mut tracker = ReceiveTracker::new(100);

        tracker.on_packet(&RtpPacket::filler(5, 100, u16::MAX, 3000, 267));
        tracker.on_packet(&RtpPacket::filler(5, 100, 0, 6000, 267));
        // 1 누락
        tracker.on_packet(&RtpPacket::filler(5, 100, 2, 6000, 267));
        // 타임스탬프 역행
        tracker.on_packet(&RtpPacket::filler(5, 100, 3, 3000, 267));
        // 미디어 패킷은 연속성 검사 제외
        tracker.on_packet(&RtpPacket::new(96, 9, 1, 5, bytes::Bytes::from_static(b"x")));

        let report = tracker.take_report(Duration::from_millis(100));
        assert_eq!(report.received_packets, 5);
        assert_eq!(report.filler_packets, 4);
        assert_eq!(report.received_bytes, 4 * 267 + 13);
        assert_eq!(report.sequence_gaps, 1);
        assert_eq!(report.timestamp_regressions, 1);

        let next = tracker.take_report(Duration::from_millis(100));
        assert_eq!(next.received_packets, 0);
        assert_eq!(next.sequence_gaps, 1);
    }

    #[test]
    fn test_timestamp_wrap_is_not_regression() {
        let mut tracker = ReceiveTracker::new(100);
        tracker.on_packet(&RtpPacket::filler(5, 100, 1, u32::MAX - 100, 267));
        tracker.on_packet(&RtpPacket::filler(5, 100, 2, 2899, 267));

        let report = tracker.take_report(Duration::from_millis(15));
        assert_eq!(report.sequence_gaps, 0);
        assert_eq!(report.timestamp_regressions, 0);
    }
}
