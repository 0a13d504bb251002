//! 영상 프레임 표시.
//!
//! 바이너리 프레임마다 표시 리소스를 만들어 교체하고, 이전 리소스를 해제한다.
//! FPS는 도착 간격의 순간값에 지수 이동 평균을 적용해 표시한다.

use camdeck_core::ports::frame_surface::{FrameHandle, FrameSurface};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, warn};

/// FPS 이동 평균 가중치
pub const FPS_SMOOTHING: f64 = 0.2;

/// 프레임 처리 결과
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameOutcome {
    /// 이번 프레임으로 로딩 → 스트리밍 전환
    pub started: bool,
    /// 갱신된 표시 FPS
    pub fps: Option<f64>,
}

/// 프레임 표시 상태
pub struct FrameDisplay {
    surface: Arc<dyn FrameSurface>,
    current: Option<FrameHandle>,
    last_arrival: Option<Instant>,
    fps: Option<f64>,
    streaming: bool,
}

impl FrameDisplay {
    pub fn new(surface: Arc<dyn FrameSurface>) -> Self {
        Self {
            surface,
            current: None,
            last_arrival: None,
            fps: None,
            streaming: false,
        }
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    pub fn fps(&self) -> Option<f64> {
        self.fps
    }

    /// 프레임 하나 표시
    ///
    /// 리소스 생성에 실패하면 이전 프레임을 유지한다.
    pub fn on_frame(&mut self, data: &[u8], now: Instant) -> FrameOutcome {
        let mut outcome = FrameOutcome::default();

        if let Some(last) = self.last_arrival {
            let delta_ms = now.saturating_duration_since(last).as_secs_f64() * 1000.0;
            if delta_ms > 0.0 {
                let instant = 1000.0 / delta_ms;
                let smoothed = match self.fps {
                    Some(prev) => prev + FPS_SMOOTHING * (instant - prev),
                    None => instant,
                };
                self.fps = Some(smoothed);
                outcome.fps = Some(smoothed);
            }
        }
        self.last_arrival = Some(now);

        let handle = match self.surface.create(data) {
            Ok(handle) => handle,
            Err(e) => {
                warn!("프레임 리소스 생성 실패 ({} bytes): {e}", data.len());
                return outcome;
            }
        };

        self.surface.present(&handle);
        if let Some(previous) = self.current.replace(handle) {
            self.surface.release(previous);
        }

        if !self.streaming {
            debug!("스트림 시작");
            self.streaming = true;
            outcome.started = true;
        }
        outcome
    }

    /// 로딩 상태로 복귀. 스트리밍 중이었으면 true.
    pub fn reset(&mut self) -> bool {
        if let Some(previous) = self.current.take() {
            self.surface.release(previous);
        }
        self.last_arrival = None;
        self.fps = None;
        std::mem::replace(&mut self.streaming, false)
    }
}

impl Drop for FrameDisplay {
    fn drop(&mut self) {
        if let Some(previous) = self.current.take() {
            self.surface.release(previous);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camdeck_core::error::CoreError;
    use parking_lot::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct CountingSurface {
        next_id: Mutex<u64>,
        presented: Mutex<Vec<u64>>,
        released: Mutex<Vec<u64>>,
    }

    impl FrameSurface for CountingSurface {
        fn create(&self, data: &[u8]) -> Result<FrameHandle, CoreError> {
            if data.is_empty() {
                return Err(CoreError::validation("frame", "빈 프레임"));
            }
            let mut next = self.next_id.lock();
            *next += 1;
            Ok(FrameHandle::new(*next, 1, 1, data.len()))
        }

        fn present(&self, handle: &FrameHandle) {
            self.presented.lock().push(handle.id());
        }

        fn release(&self, handle: FrameHandle) {
            self.released.lock().push(handle.id());
        }
    }

    #[test]
    fn each_replaced_frame_is_released_once() {
        let surface = Arc::new(CountingSurface::default());
        let mut display = FrameDisplay::new(surface.clone());
        let t0 = Instant::now();

        let first = display.on_frame(b"jpeg-1", t0);
        assert!(first.started);
        assert_eq!(first.fps, None);

        let second = display.on_frame(b"jpeg-2", t0 + Duration::from_millis(100));
        assert!(!second.started);
        display.on_frame(b"jpeg-3", t0 + Duration::from_millis(200));

        assert_eq!(*surface.presented.lock(), vec![1, 2, 3]);
        assert_eq!(*surface.released.lock(), vec![1, 2]);

        drop(display);
        assert_eq!(*surface.released.lock(), vec![1, 2, 3]);
    }

    #[test]
    fn fps_is_smoothed() {
        let surface = Arc::new(CountingSurface::default());
        let mut display = FrameDisplay::new(surface);
        let t0 = Instant::now();

        display.on_frame(b"a", t0);
        let fps = display.on_frame(b"b", t0 + Duration::from_millis(100)).fps.unwrap();
        assert!((fps - 10.0).abs() < 1e-9);

        // 순간값 20fps → 10 + 0.2 * (20 - 10) = 12
        let fps = display.on_frame(b"c", t0 + Duration::from_millis(150)).fps.unwrap();
        assert!((fps - 12.0).abs() < 1e-9);
    }

    #[test]
    fn same_instant_does_not_update_fps() {
        let surface = Arc::new(CountingSurface::default());
        let mut display = FrameDisplay::new(surface);
        let t0 = Instant::now();

        display.on_frame(b"a", t0);
        assert_eq!(display.on_frame(b"b", t0).fps, None);
    }

    #[test]
    fn failed_frame_keeps_previous_resource() {
        let surface = Arc::new(CountingSurface::default());
        let mut display = FrameDisplay::new(surface.clone());
        let t0 = Instant::now();

        display.on_frame(b"a", t0);
        display.on_frame(b"", t0 + Duration::from_millis(50));
        assert!(surface.released.lock().is_empty());
        assert!(display.is_streaming());
    }

    #[test]
    fn reset_releases_and_returns_to_loading() {
        let surface = Arc::new(CountingSurface::default());
        let mut display = FrameDisplay::new(surface.clone());

        display.on_frame(b"a", Instant::now());
        assert!(display.reset());
        assert!(!display.reset());
        assert_eq!(*surface.released.lock(), vec![1]);
        assert_eq!(display.fps(), None);

        assert!(display.on_frame(b"b", Instant::now()).started);
    }
}
