//! 프레임 표시 표면 포트.
//!
//! 수신한 바이너리 프레임을 표시 가능한 리소스로 만들고, 교체 시 이전 리소스를
//! 해제한다. `FrameHandle`은 복제할 수 없으므로 리소스마다 해제는 정확히 한 번이다.
//!
//! 구현: `camdeck-app` crate (image 디코더 + 파일 출력)

use crate::error::CoreError;

/// 표시 리소스 핸들
#[derive(Debug, PartialEq, Eq)]
pub struct FrameHandle {
    id: u64,
    /// 디코딩된 너비 (픽셀)
    pub width: u32,
    /// 디코딩된 높이 (픽셀)
    pub height: u32,
    /// 원본 페이로드 크기 (바이트)
    pub byte_len: usize,
}

impl FrameHandle {
    /// 표면 구현체가 발급하는 핸들 생성
    pub fn new(id: u64, width: u32, height: u32, byte_len: usize) -> Self {
        Self {
            id,
            width,
            height,
            byte_len,
        }
    }

    /// 표면 내부 리소스 ID
    pub fn id(&self) -> u64 {
        self.id
    }
}

/// 프레임 표시 표면
pub trait FrameSurface: Send + Sync {
    /// 바이너리 프레임으로 표시 리소스 생성
    fn create(&self, data: &[u8]) -> Result<FrameHandle, CoreError>;

    /// 리소스를 화면에 표시
    fn present(&self, handle: &FrameHandle);

    /// 리소스 해제
    fn release(&self, handle: FrameHandle);
}
