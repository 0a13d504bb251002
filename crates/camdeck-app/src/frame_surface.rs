//! 이미지 프레임 표면.
//!
//! 수신한 JPEG/PNG 프레임의 헤더만 읽어 크기를 확인하고, 설정된 경우 최신 프레임을
//! 파일로 기록한다. 살아 있는 리소스는 핸들 ID로 추적하며 `release`에서 제거한다.
//!
//! 파일 기록은 세션 태스크 밖에서 한다. 런타임 안에서 만들면 기록 태스크가 최신 프레임만
//! 받아 `spawn_blocking`으로 쓰고, 밀린 프레임은 건너뛴다.

use camdeck_core::error::CoreError;
use camdeck_core::ports::frame_surface::{FrameHandle, FrameSurface};
use image::ImageReader;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, warn};

type FrameBytes = Arc<[u8]>;

/// 최신 프레임 기록기
enum FrameWriter {
    /// 기록 태스크로 최신 프레임 전달
    Background(watch::Sender<Option<FrameBytes>>),
    /// 런타임 밖: 호출 스레드에서 바로 기록
    Inline(PathBuf),
}

/// `image` 헤더 디코더 기반 표면
pub struct ImageFrameSurface {
    next_id: AtomicU64,
    writer: Option<FrameWriter>,
    live: Mutex<HashMap<u64, FrameBytes>>,
}

impl ImageFrameSurface {
    /// `output`이 있으면 표시할 때마다 해당 경로에 원본 프레임을 기록
    pub fn new(output: Option<PathBuf>) -> Self {
        let writer = output.map(|path| match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let (tx, rx) = watch::channel(None);
                runtime.spawn(write_latest(path, rx));
                FrameWriter::Background(tx)
            }
            Err(_) => FrameWriter::Inline(path),
        });
        Self {
            next_id: AtomicU64::new(1),
            writer,
            live: Mutex::new(HashMap::new()),
        }
    }

    /// 해제되지 않은 리소스 수
    pub fn live_count(&self) -> usize {
        self.live.lock().len()
    }
}

fn write_frame(path: &Path, data: &[u8]) -> Result<(), CoreError> {
    // 부분 기록된 파일이 보이지 않도록 임시 파일에 쓴 뒤 교체
    let tmp = path.with_extension("part");
    fs::write(&tmp, data)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// 기록 태스크: 표면이 드롭되어 송신 측이 닫히면 종료
async fn write_latest(path: PathBuf, mut latest: watch::Receiver<Option<FrameBytes>>) {
    while latest.changed().await.is_ok() {
        let Some(data) = latest.borrow_and_update().clone() else {
            continue;
        };
        let target = path.clone();
        match tokio::task::spawn_blocking(move || write_frame(&target, &data)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("프레임 기록 실패: {e}"),
            Err(e) => warn!("프레임 기록 태스크 실패: {e}"),
        }
    }
    debug!("프레임 기록 태스크 종료: {}", path.display());
}

fn invalid_frame(e: impl fmt::Display) -> CoreError {
    CoreError::validation("frame", format!("프레임 디코딩 실패: {e}"))
}

/// 헤더만 읽어 크기 확인 (픽셀 디코딩 없음)
fn frame_dimensions(data: &[u8]) -> Result<(u32, u32), CoreError> {
    ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(invalid_frame)?
        .into_dimensions()
        .map_err(invalid_frame)
}

impl FrameSurface for ImageFrameSurface {
    fn create(&self, data: &[u8]) -> Result<FrameHandle, CoreError> {
        let (width, height) = frame_dimensions(data)?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.live.lock().insert(id, Arc::from(data));
        Ok(FrameHandle::new(id, width, height, data.len()))
    }

    fn present(&self, handle: &FrameHandle) {
        let Some(writer) = &self.writer else {
            return;
        };
        let Some(data) = self.live.lock().get(&handle.id()).cloned() else {
            warn!("해제된 프레임 표시 요청: id={}", handle.id());
            return;
        };
        match writer {
            FrameWriter::Background(latest) => {
                if latest.send(Some(data)).is_err() {
                    warn!("프레임 기록 태스크가 종료됨");
                }
            }
            FrameWriter::Inline(path) => match write_frame(path, &data) {
                Ok(()) => debug!(
                    "프레임 기록: {}x{} {}B → {}",
                    handle.width,
                    handle.height,
                    handle.byte_len,
                    path.display()
                ),
                Err(e) => warn!("프레임 기록 실패: {e}"),
            },
        }
    }

    fn release(&self, handle: FrameHandle) {
        if self.live.lock().remove(&handle.id()).is_none() {
            warn!("이미 해제된 프레임: id={}", handle.id());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, ImageFormat, Rgb};
    use std::io::Cursor;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = ImageBuffer::from_pixel(width, height, Rgb([10u8, 20, 30]));
        let mut bytes = Cursor::new(Vec::new());
        img.write_to(&mut bytes, ImageFormat::Png).unwrap();
        bytes.into_inner()
    }

    #[test]
    fn decodes_dimensions_and_tracks_resources() {
        let surface = ImageFrameSurface::new(None);
        let data = png(4, 3);

        let handle = surface.create(&data).unwrap();
        assert_eq!((handle.width, handle.height), (4, 3));
        assert_eq!(handle.byte_len, data.len());
        assert_eq!(surface.live_count(), 1);

        surface.release(handle);
        assert_eq!(surface.live_count(), 0);
    }

    #[test]
    fn garbage_is_rejected_without_allocating() {
        let surface = ImageFrameSurface::new(None);
        let err = surface.create(b"not an image").unwrap_err();
        assert!(matches!(err, CoreError::Validation { ref field, .. } if field == "frame"));
        assert_eq!(surface.live_count(), 0);
    }

    #[test]
    fn present_writes_latest_frame() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latest.png");
        let surface = ImageFrameSurface::new(Some(path.clone()));

        let first = surface.create(&png(2, 2)).unwrap();
        surface.present(&first);
        let second_data = png(5, 1);
        let second = surface.create(&second_data).unwrap();
        surface.present(&second);
        surface.release(first);

        assert_eq!(fs::read(&path).unwrap(), second_data);
        assert_eq!(surface.live_count(), 1);
        surface.release(second);
    }

    #[test]
    fn corrupt_pixels_still_report_header_size() {
        let surface = ImageFrameSurface::new(None);
        let mut data = png(640, 480);
        // IDAT 이후의 압축 데이터만 훼손 (마지막 12바이트는 IEND)
        let idat = data.windows(4).position(|w| w == b"IDAT").unwrap() + 4;
        let end = data.len() - 12;
        data[idat..end].fill(0xFF);

        let handle = surface.create(&data).unwrap();
        assert_eq!((handle.width, handle.height), (640, 480));
        surface.release(handle);
    }

    #[tokio::test]
    async fn present_inside_runtime_writes_in_background() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latest.png");
        let surface = ImageFrameSurface::new(Some(path.clone()));
        assert!(matches!(surface.writer, Some(FrameWriter::Background(_))));

        let first = surface.create(&png(2, 2)).unwrap();
        surface.present(&first);
        let second_data = png(3, 3);
        let second = surface.create(&second_data).unwrap();
        surface.present(&second);
        // 기록은 리소스 해제와 무관
        surface.release(first);
        surface.release(second);

        let mut written = None;
        for _ in 0..200 {
            written = fs::read(&path).ok();
            if written.as_deref() == Some(&second_data[..]) {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(written.as_deref(), Some(&second_data[..]));
    }
}
