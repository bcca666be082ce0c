//! 프로빙 싱크 - UDP 수신 + 수신자 리포트
//!
//! 송신기가 보내는 RTP 패킷을 받아 수신율을 재고, 필러 패킷의
//! 시퀀스 / 타임스탬프 연속성을 검사한 뒤 주기적으로 리포트를 돌려보냄
//!
//! 사용법:
//!   cargo run --release --bin probe-sink -- [OPTIONS]

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use tokio::net::UdpSocket;
use tracing::{debug, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use sfu_probe::config::DEFAULT_FILLER_PAYLOAD_TYPE;
use sfu_probe::{ReceiveTracker, RtpPacket};

/// 싱크 설정
struct SinkConfig {
    bind_addr: SocketAddr,
    report_interval: Duration,
    filler_payload_type: u8,
    verbose: bool,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 9100)),
            report_interval: Duration::from_millis(200),
            filler_payload_type: DEFAULT_FILLER_PAYLOAD_TYPE,
            verbose: false,
        }
    }
}

fn parse_args() -> Result<SinkConfig, String> {
    let args: Vec<String> = std::env::args().collect();
    let mut config = SinkConfig::default();

    let mut i = 1;
    while i < args.len() {
        let value = args.get(i + 1).cloned().unwrap_or_default();
        match args[i].as_str() {
            "--bind" | "-b" => {
                config.bind_addr = value.parse().map_err(|_| "유효한 주소 필요: --bind")?;
                i += 1;
            }
            "--report-ms" => {
                let ms: u64 = value.parse().map_err(|_| "유효한 숫자 필요: --report-ms")?;
                config.report_interval = Duration::from_millis(ms.max(1));
                i += 1;
            }
            "--filler-pt" => {
                config.filler_payload_type =
                    value.parse().map_err(|_| "유효한 숫자 필요: --filler-pt")?;
                i += 1;
            }
            "--verbose" | "-v" => {
                config.verbose = true;
            }
            "--help" | "-h" => {
                println!(
                    r#"Probe Sink - 프로빙 트래픽 수신기

사용법:
  cargo run --release --bin probe-sink -- [OPTIONS]

옵션:
  -b, --bind <ADDR>       바인드 주소 (기본: 0.0.0.0:9100)
  --report-ms <MS>        리포트 주기 (기본: 200)
  --filler-pt <PT>        필러 페이로드 타입 (기본: 100)
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

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let sink_config = parse_args()?;

    // 로깅 설정
    let level = if sink_config.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let socket = UdpSocket::bind(sink_config.bind_addr).await?;
    info!("Probe Sink listening on {}", sink_config.bind_addr);

    let mut tracker = ReceiveTracker::new(sink_config.filler_payload_type);
    let mut sender_addr: Option<SocketAddr> = None;
    let mut report_timer = tokio::time::interval(sink_config.report_interval);
    let mut last_report = Instant::now();
    let mut buf = vec![0u8; 65535];

    loop {
        tokio::select! {
            result = socket.recv_from(&mut buf) => {
                match result {
                    Ok((len, addr)) => {
                        sender_addr.get_or_insert(addr);
                        match RtpPacket::parse(&buf[..len]) {
                            Ok(packet) => tracker.on_packet(&packet),
                            Err(e) => debug!("RTP 아님 ({}): {}", addr, e),
                        }
                    }
                    Err(e) => {
                        warn!("수신 에러: {}", e);
                    }
                }
            }
            _ = report_timer.tick() => {
                let Some(addr) = sender_addr else {
                    last_report = Instant::now();
                    continue;
                };

                let report = tracker.take_report(last_report.elapsed());
                last_report = Instant::now();

                if let Err(e) = socket.send_to(&report.to_bytes(), addr).await {
                    warn!("리포트 전송 실패: {}", e);
                }

                info!(
                    "rate={:.1} kbps, packets={}, filler={}, gaps={}, regressions={}",
                    report.receive_rate_bps() as f64 / 1000.0,
                    report.received_packets,
                    report.filler_packets,
                    report.sequence_gaps,
                    report.timestamp_regressions,
                );
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }
    }

    Ok(())
}
