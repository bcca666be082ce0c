//! RTP 패킷 정의
//!
//! 필러 생성에 필요한 만큼만 다룸
//! - 고정 헤더 12바이트 (CSRC / 확장 헤더 없음)
//! - 캐시 가능 여부는 와이어에 실리지 않는 로컬 표시

use bytes::{BufMut, Bytes, BytesMut};

use crate::{Error, Result, Ssrc, RTP_FIXED_HEADER_SIZE};

/// RTP 버전
pub const RTP_VERSION: u8 = 2;

/// RTP 패킷
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtpPacket {
    /// 마커 비트
    pub marker: bool,

    /// 페이로드 타입 (7비트)
    pub payload_type: u8,

    /// 시퀀스 번호
    pub sequence_number: u16,

    /// RTP 타임스탬프
    pub timestamp: u32,

    /// 송신자 SSRC
    pub ssrc: Ssrc,

    /// 페이로드
    pub payload: Bytes,

    /// 재전송 버퍼 보관 허용 여부
    /// false인 패킷은 RTX 캐시에 넣으면 안 됨
    cacheable: bool,
}

impl RtpPacket {
    /// 새 미디어 패킷 생성 (캐시 가능)
    pub fn new(
        payload_type: u8,
        sequence_number: u16,
        timestamp: u32,
        ssrc: Ssrc,
        payload: Bytes,
    ) -> Self {
        Self {
            marker: false,
            payload_type: payload_type & 0x7F,
            sequence_number,
            timestamp,
            ssrc,
            payload,
            cacheable: true,
        }
    }

    /// 내용 없는 필러 패킷 생성
    ///
    /// `packet_len`은 헤더를 포함한 전체 길이. 페이로드는 0으로 채워지고
    /// 패킷은 캐시 불가로 표시됨
    pub fn filler(
        ssrc: Ssrc,
        payload_type: u8,
        sequence_number: u16,
        timestamp: u32,
        packet_len: usize,
    ) -> Self {
        let payload_len = packet_len.saturating_sub(RTP_FIXED_HEADER_SIZE);
        let mut packet = Self::new(
            payload_type,
            sequence_number,
            timestamp,
            ssrc,
            Bytes::from(vec![0u8; payload_len]),
        );
        packet.cacheable = false;
        packet
    }

    /// 재전송 캐시에 보관해도 되는지
    pub fn is_cacheable(&self) -> bool {
        self.cacheable
    }

    /// 헤더 포함 전체 길이
    pub fn len(&self) -> usize {
        RTP_FIXED_HEADER_SIZE + self.payload.len()
    }

    /// 페이로드가 없는지 (헤더만 있는 패킷)
    pub fn is_payload_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// 바이트로 직렬화
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.len());

        // V=2, P=0, X=0, CC=0
        buf.put_u8(RTP_VERSION << 6);
        buf.put_u8(((self.marker as u8) << 7) | (self.payload_type & 0x7F));
        buf.put_u16(self.sequence_number);
        buf.put_u32(self.timestamp);
        buf.put_u32(self.ssrc);
        buf.put_slice(&self.payload);

        buf.freeze()
    }

    /// 바이트에서 역직렬화
    ///
    /// 수신측에서는 캐시 여부를 알 수 없으므로 캐시 가능으로 복원됨
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < RTP_FIXED_HEADER_SIZE {
            return Err(Error::PacketTooShort { len: bytes.len() });
        }

        let version = bytes[0] >> 6;
        if version != RTP_VERSION {
            return Err(Error::InvalidRtpVersion { got: version });
        }

        let csrc_count = (bytes[0] & 0x0F) as usize;
        let header_len = RTP_FIXED_HEADER_SIZE + csrc_count * 4;
        if bytes.len() < header_len {
            return Err(Error::PacketTooShort { len: bytes.len() });
        }

        Ok(Self {
            marker: bytes[1] & 0x80 != 0,
            payload_type: bytes[1] & 0x7F,
            sequence_number: u16::from_be_bytes([bytes[2], bytes[3]]),
            timestamp: u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
            ssrc: u32::from_be_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]),
            payload: Bytes::copy_from_slice(&bytes[header_len..]),
            cacheable: true,
        })
    }
}
