//! 주기 실행기
//!
//! 엔진을 tokio 태스크 하나에서 고정 주기로 실행. 틱은 항상 직렬로 실행되고
//! 밀린 틱은 몰아서 실행하지 않음

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::channel::ProbeChannel;
use crate::probing::BandwidthProbing;
use crate::Result;

/// 실행 중인 프로빙 태스크
pub struct ProbingTask<C: ProbeChannel + 'static> {
    /// 실행 중 플래그
    running: Arc<AtomicBool>,

    /// 정지 알림
    shutdown: Arc<Notify>,

    /// 태스크 핸들 (정지 시 엔진을 돌려줌)
    handle: JoinHandle<BandwidthProbing<C>>,
}

impl<C: ProbeChannel + 'static> ProbingTask<C> {
    /// 엔진을 주기 태스크로 시작
    pub fn spawn(mut probing: BandwidthProbing<C>) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let shutdown = Arc::new(Notify::new());

        let running_ref = running.clone();
        let shutdown_ref = shutdown.clone();

        let handle = tokio::spawn(async move {
            let period = probing.period();
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            info!("프로빙 시작: period={:?}", period);

            while running_ref.load(Ordering::SeqCst) {
                tokio::select! {
                    _ = interval.tick() => {
                        // 틱 안의 실패는 틱 안에서 끝남
                        if let Err(e) = probing.run_once() {
                            warn!("프로빙 틱 에러: {}", e);
                        }
                    }
                    _ = shutdown_ref.notified() => {}
                }
            }

            info!("프로빙 정지: {}", probing.stats().summary());
            probing
        });

        Self {
            running,
            shutdown,
            handle,
        }
    }

    /// 실행 중인지
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst) && !self.handle.is_finished()
    }

    /// 정지 요청 (이후 틱은 실행되지 않음)
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.shutdown.notify_one();
    }

    /// 정지하고 엔진을 돌려받음
    pub async fn shutdown(self) -> Result<BandwidthProbing<C>> {
        self.stop();
        Ok(self.handle.await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::Plane;
    use crate::{PaddingTarget, ProbingConfig, RtpPacket, Ssrc};
    use parking_lot::Mutex;
    use std::time::Duration;

    struct CountingChannel {
        injected: Mutex<usize>,
    }

    impl ProbeChannel for CountingChannel {
        fn padding_targets(&self) -> Vec<PaddingTarget> {
            vec![PaddingTarget::new(None, 100_000, 1_000_000)]
        }

        fn latest_estimate(&self) -> u64 {
            500_000
        }

        fn update_allocation(&self, _target: Option<Ssrc>, _bandwidth_bps: u64) {}

        fn send_protection_padding(&self, _ssrc: Ssrc, bytes: usize) -> usize {
            bytes
        }

        fn inject_packet(&self, _packet: RtpPacket, _plane: Plane) -> Result<()> {
            *self.injected.lock() += 1;
            Ok(())
        }

        fn local_ssrc(&self) -> Option<Ssrc> {
            Some(1)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_periodic_ticks_and_stop() {
        let channel = Arc::new(CountingChannel {
            injected: Mutex::new(0),
        });
        let probing = BandwidthProbing::new(channel.clone(), ProbingConfig::default()).unwrap();

        let task = ProbingTask::spawn(probing);
        assert!(task.is_running());

        tokio::time::sleep(Duration::from_millis(100)).await;
        let probing = task.shutdown().await.unwrap();

        let ticks = probing.stats().ticks;
        assert!(ticks >= 6, "ticks={}", ticks);
        assert_eq!(probing.stats().filler_ticks, ticks);
        assert_eq!(*channel.injected.lock() as u64, probing.stats().filler_packets);

        // 정지 후에는 더 이상 주입되지 않음
        let before = *channel.injected.lock();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(*channel.injected.lock(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_errors_do_not_stop_loop() {
        struct NoSsrc;

        impl ProbeChannel for NoSsrc {
            fn padding_targets(&self) -> Vec<PaddingTarget> {
                vec![PaddingTarget::new(None, 100_000, 1_000_000)]
            }
            fn latest_estimate(&self) -> u64 {
                500_000
            }
            fn update_allocation(&self, _target: Option<Ssrc>, _bandwidth_bps: u64) {}
            fn send_protection_padding(&self, _ssrc: Ssrc, bytes: usize) -> usize {
                bytes
            }
            fn inject_packet(&self, _packet: RtpPacket, _plane: Plane) -> Result<()> {
                Ok(())
            }
            fn local_ssrc(&self) -> Option<Ssrc> {
                None
            }
        }

        let probing = BandwidthProbing::new(Arc::new(NoSsrc), ProbingConfig::low_latency()).unwrap();
        let task = ProbingTask::spawn(probing);

        tokio::time::sleep(Duration::from_millis(55)).await;
        let probing = task.shutdown().await.unwrap();

        assert!(probing.stats().ticks >= 3);
        assert_eq!(
            probing.stats().unresolved_sender_ticks,
            probing.stats().ticks
        );
    }
}
