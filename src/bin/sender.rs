//! 프로빙 송신기 - 시뮬레이션 채널 + UDP 전송
//!
//! 고정된 패딩 대상(시뮬캐스트 레이어)을 가진 가상 채널에서 프로빙 엔진을 돌리고
//! 필러 / RTX 패딩을 UDP로 싱크에 보냄. 싱크가 보내는 수신자 리포트의
//! 수신율을 대역폭 추정치로 사용
//!
//! 사용법:
//!   cargo run --release --bin probe-sender -- [OPTIONS]
//!
//! 예시:
//!   cargo run --release --bin probe-sender -- --peer 127.0.0.1:9100 --duration 10

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::{Mutex, RwLock};
use tokio::net::UdpSocket;
use tracing::{debug, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use sfu_probe::{
    BandwidthProbing, Error, PaddingTarget, Plane, ProbeChannel, ProbingConfig, ProbingTask,
    ReceiverReport, Result, RtpPacket, Ssrc,
};

/// RTX 패딩 패킷 페이로드 타입
const RTX_PAYLOAD_TYPE: u8 = 97;

/// 송신기 설정
struct SenderConfig {
    bind_addr: SocketAddr,
    peer_addr: SocketAddr,
    duration_secs: u64,
    initial_estimate_bps: u64,
    rtx_bytes_per_tick: usize,
    local_ssrc: Ssrc,
    verbose: bool,
    config: ProbingConfig,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 9000)),
            peer_addr: SocketAddr::from(([127, 0, 0, 1], 9100)),
            duration_secs: 10,
            initial_estimate_bps: 500_000,
            rtx_bytes_per_tick: 300,
            local_ssrc: rand::random(),
            verbose: false,
            config: ProbingConfig::default(),
        }
    }
}

fn parse_args() -> std::result::Result<SenderConfig, String> {
    let args: Vec<String> = std::env::args().collect();
    let mut config = SenderConfig::default();

    let mut i = 1;
    while i < args.len() {
        let value = args.get(i + 1).cloned().unwrap_or_default();
        match args[i].as_str() {
            "--bind" | "-b" => {
                config.bind_addr = value.parse().map_err(|_| "유효한 주소 필요: --bind")?;
                i += 1;
            }
            "--peer" | "-p" => {
                config.peer_addr = value.parse().map_err(|_| "유효한 주소 필요: --peer")?;
                i += 1;
            }
            "--duration" | "-d" => {
                config.duration_secs = value.parse().map_err(|_| "유효한 숫자 필요: --duration")?;
                i += 1;
            }
            "--period" => {
                config.config.padding_period_ms =
                    value.parse().map_err(|_| "유효한 숫자 필요: --period")?;
                i += 1;
            }
            "--estimate" => {
                config.initial_estimate_bps =
                    value.parse().map_err(|_| "유효한 숫자 필요: --estimate")?;
                i += 1;
            }
            "--rtx-bytes" => {
                config.rtx_bytes_per_tick =
                    value.parse().map_err(|_| "유효한 숫자 필요: --rtx-bytes")?;
                i += 1;
            }
            "--verbose" | "-v" => {
                config.verbose = true;
            }
            "--help" | "-h" => {
                println!(
                    r#"Probe Sender - SFU 대역폭 프로빙 시뮬레이터

사용법:
  cargo run --release --bin probe-sender -- [OPTIONS]

옵션:
  -b, --bind <ADDR>       바인드 주소 (기본: 0.0.0.0:9000)
  -p, --peer <ADDR>       싱크 주소 (기본: 127.0.0.1:9100)
  -d, --duration <SEC>    실행 시간 (기본: 10)
  --period <MS>           틱 주기 (기본: 15)
  --estimate <BPS>        초기 대역폭 추정치 (기본: 500000)
  --rtx-bytes <N>         틱당 스트림별 RTX 패딩 상한 (기본: 300)
  -v, --verbose           디버그 로그
  -h, --help              이 도움말 출력
"#
                );
                std::process::exit(0);
            }
            other => return Err(format!("알 수 없는 옵션: {}", other)),
        }
        i += 1;
    }

    Ok(config)
}

/// 시뮬레이션 레이어
#[derive(Debug, Clone)]
struct Layer {
    ssrc: Ssrc,
    optimal_bps: u64,
    current_bps: u64,
    rtx_sequence: u16,
}

/// 시뮬레이션 채널
///
/// - 할당: 추정치를 레이어 순서대로 최적값까지 나눠줌
/// - RTX: 틱당 스트림별 `rtx_bytes_per_tick`까지만 흡수
/// - 전송: 논블로킹 UDP 송신
struct SimChannel {
    socket: Arc<UdpSocket>,
    peer_addr: SocketAddr,
    local_ssrc: Ssrc,
    rtx_bytes_per_tick: usize,
    layers: RwLock<Vec<Layer>>,
    estimate_bps: RwLock<u64>,
    rtx_sent: Mutex<u64>,
}

impl SimChannel {
    fn new(socket: Arc<UdpSocket>, config: &SenderConfig) -> Self {
        let layers = vec![
            Layer {
                ssrc: 1001,
                optimal_bps: 150_000,
                current_bps: 150_000,
                rtx_sequence: 0,
            },
            Layer {
                ssrc: 1002,
                optimal_bps: 500_000,
                current_bps: 0,
                rtx_sequence: 0,
            },
            Layer {
                ssrc: 1003,
                optimal_bps: 1_500_000,
                current_bps: 0,
                rtx_sequence: 0,
            },
        ];

        Self {
            socket,
            peer_addr: config.peer_addr,
            local_ssrc: config.local_ssrc,
            rtx_bytes_per_tick: config.rtx_bytes_per_tick,
            layers: RwLock::new(layers),
            estimate_bps: RwLock::new(config.initial_estimate_bps),
            rtx_sent: Mutex::new(0),
        }
    }

    /// 리포트 수신율로 추정치 갱신 (조금 위로 탐색)
    fn on_report(&self, report: &ReceiverReport) {
        let rate = report.receive_rate_bps();
        if rate == 0 {
            return;
        }
        let estimate = rate.saturating_add(rate / 10);
        *self.estimate_bps.write() = estimate;
        debug!(
            "리포트: rate={} bps, estimate={} bps, gaps={}, regressions={}",
            rate, estimate, report.sequence_gaps, report.timestamp_regressions
        );
    }

    fn send(&self, packet: &RtpPacket) -> Result<()> {
        self.socket
            .try_send_to(&packet.to_bytes(), self.peer_addr)
            .map_err(|e| Error::TransmissionFailed {
                ssrc: packet.ssrc,
                sequence_number: packet.sequence_number,
                reason: e.to_string(),
            })?;
        Ok(())
    }
}

impl ProbeChannel for SimChannel {
    fn padding_targets(&self) -> Vec<PaddingTarget> {
        self.layers
            .read()
            .iter()
            .map(|l| PaddingTarget::new(Some(l.ssrc), l.current_bps, l.optimal_bps))
            .collect()
    }

    fn latest_estimate(&self) -> u64 {
        *self.estimate_bps.read()
    }

    fn update_allocation(&self, _target: Option<Ssrc>, bandwidth_bps: u64) {
        let mut remaining = bandwidth_bps;
        for layer in self.layers.write().iter_mut() {
            layer.current_bps = layer.optimal_bps.min(remaining);
            remaining -= layer.current_bps;
        }
        info!("할당 갱신: bandwidth={} bps", bandwidth_bps);
    }

    fn send_protection_padding(&self, ssrc: Ssrc, bytes: usize) -> usize {
        let len = bytes.min(self.rtx_bytes_per_tick);
        if len <= sfu_probe::RTP_FIXED_HEADER_SIZE {
            return bytes;
        }

        let sequence_number = {
            let mut layers = self.layers.write();
            match layers.iter_mut().find(|l| l.ssrc == ssrc) {
                Some(layer) => {
                    layer.rtx_sequence = layer.rtx_sequence.wrapping_add(1);
                    layer.rtx_sequence
                }
                None => return bytes,
            }
        };

        let payload = Bytes::from(vec![0u8; len - sfu_probe::RTP_FIXED_HEADER_SIZE]);
        let packet = RtpPacket::new(RTX_PAYLOAD_TYPE, sequence_number, 0, ssrc, payload);
        match self.send(&packet) {
            Ok(()) => {
                *self.rtx_sent.lock() += len as u64;
                bytes - len
            }
            Err(e) => {
                warn!("RTX 패딩 전송 실패: {}", e);
                bytes
            }
        }
    }

    fn inject_packet(&self, packet: RtpPacket, _plane: Plane) -> Result<()> {
        // 시뮬레이션에는 SRTP 변환이 없으므로 바로 전송
        self.send(&packet)
    }

    fn local_ssrc(&self) -> Option<Ssrc> {
        Some(self.local_ssrc)
    }
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let sender_config = parse_args()?;

    // 로깅 설정
    let level = if sender_config.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    sender_config.config.validate()?;

    info!("Probe Sender starting...");
    info!("Bind address: {}", sender_config.bind_addr);
    info!("Peer address: {}", sender_config.peer_addr);
    info!("Padding period: {} ms", sender_config.config.padding_period_ms);
    info!("Local SSRC: {:08X}", sender_config.local_ssrc);

    let socket = Arc::new(UdpSocket::bind(sender_config.bind_addr).await?);
    let channel = Arc::new(SimChannel::new(socket.clone(), &sender_config));

    // ─────────────────────────────────────────────────────────────────
    // 리포트 수신 태스크
    // ─────────────────────────────────────────────────────────────────
    let report_channel = channel.clone();
    let report_task = tokio::spawn(async move {
        let mut buf = vec![0u8; 2048];
        loop {
            match socket.recv_from(&mut buf).await {
                Ok((len, addr)) => match ReceiverReport::from_bytes(&buf[..len]) {
                    Ok(report) => report_channel.on_report(&report),
                    Err(e) => debug!("리포트 아님 ({}): {}", addr, e),
                },
                Err(e) => {
                    warn!("수신 에러: {}", e);
                }
            }
        }
    });

    let probing = BandwidthProbing::new(channel.clone(), sender_config.config.clone())?;
    let task = ProbingTask::spawn(probing);

    tokio::select! {
        _ = tokio::time::sleep(Duration::from_secs(sender_config.duration_secs)) => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted");
        }
    }

    let probing = task.shutdown().await?;
    report_task.abort();

    info!("{}", probing.stats().summary());
    info!("RTX padding bytes: {}", *channel.rtx_sent.lock());
    for layer in channel.layers.read().iter() {
        info!(
            "  layer {}: current={} bps, optimal={} bps",
            layer.ssrc, layer.current_bps, layer.optimal_bps
        );
    }

    Ok(())
}
