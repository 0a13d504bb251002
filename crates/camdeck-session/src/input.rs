//! 키/게임패드 바인딩.
//!
//! 방향키는 누르면 이동, 떼면 정지(`hault`).
//! `a`/`b` 버튼은 누르면 ON, 떼면 OFF.
//! 게임패드는 D-패드가 방향키, 남쪽/동쪽 버튼이 `a`/`b`와 같다.

use camdeck_core::error::CoreError;
use camdeck_core::models::command::CommandToken;
use std::fmt;
use std::str::FromStr;

/// 바인딩된 키
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    A,
    B,
}

/// 키 이벤트 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPhase {
    Press,
    Release,
}

impl Key {
    pub fn is_arrow(&self) -> bool {
        matches!(
            self,
            Key::ArrowUp | Key::ArrowDown | Key::ArrowLeft | Key::ArrowRight
        )
    }

    /// 키 이벤트에 대응하는 명령 토큰
    pub fn command(&self, phase: KeyPhase) -> CommandToken {
        match (self, phase) {
            (Key::ArrowUp, KeyPhase::Press) => CommandToken::Forward,
            (Key::ArrowDown, KeyPhase::Press) => CommandToken::Reverse,
            (Key::ArrowLeft, KeyPhase::Press) => CommandToken::Left,
            (Key::ArrowRight, KeyPhase::Press) => CommandToken::Right,
            (
                Key::ArrowUp | Key::ArrowDown | Key::ArrowLeft | Key::ArrowRight,
                KeyPhase::Release,
            ) => CommandToken::Halt,
            (Key::A, KeyPhase::Press) => CommandToken::AOn,
            (Key::A, KeyPhase::Release) => CommandToken::AOff,
            (Key::B, KeyPhase::Press) => CommandToken::BOn,
            (Key::B, KeyPhase::Release) => CommandToken::BOff,
        }
    }
}

/// 바인딩된 게임패드 버튼 (표준 배치 기준)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GamepadButton {
    DPadUp,
    DPadDown,
    DPadLeft,
    DPadRight,
    /// 남쪽 버튼 (Xbox A, PlayStation ×)
    South,
    /// 동쪽 버튼 (Xbox B, PlayStation ○)
    East,
}

impl GamepadButton {
    /// 같은 동작을 하는 키
    pub fn key(&self) -> Key {
        match self {
            GamepadButton::DPadUp => Key::ArrowUp,
            GamepadButton::DPadDown => Key::ArrowDown,
            GamepadButton::DPadLeft => Key::ArrowLeft,
            GamepadButton::DPadRight => Key::ArrowRight,
            GamepadButton::South => Key::A,
            GamepadButton::East => Key::B,
        }
    }

    pub fn command(&self, phase: KeyPhase) -> CommandToken {
        self.key().command(phase)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Key::ArrowUp => "ArrowUp",
            Key::ArrowDown => "ArrowDown",
            Key::ArrowLeft => "ArrowLeft",
            Key::ArrowRight => "ArrowRight",
            Key::A => "a",
            Key::B => "b",
        };
        f.write_str(name)
    }
}

impl FromStr for Key {
    type Err = CoreError;

    /// `ArrowUp`/`up`, `a`/`A` 등
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "a" | "A" => return Ok(Key::A),
            "b" | "B" => return Ok(Key::B),
            _ => {}
        }

        let lowered = s.to_ascii_lowercase();
        let name = lowered.strip_prefix("arrow").unwrap_or(&lowered);
        match name {
            "up" => Ok(Key::ArrowUp),
            "down" => Ok(Key::ArrowDown),
            "left" => Ok(Key::ArrowLeft),
            "right" => Ok(Key::ArrowRight),
            _ => Err(CoreError::validation("key", format!("알 수 없는 키: {s}"))),
        }
    }
}
