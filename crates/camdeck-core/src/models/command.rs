//! 모터/LED 명령 토큰.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// 카메라 측 장치로 전달되는 명령 토큰
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandToken {
    #[serde(rename = "forward")]
    Forward,
    #[serde(rename = "reverse")]
    Reverse,
    #[serde(rename = "left")]
    Left,
    #[serde(rename = "right")]
    Right,
    #[serde(rename = "AON")]
    AOn,
    #[serde(rename = "AOFF")]
    AOff,
    #[serde(rename = "BON")]
    BOn,
    #[serde(rename = "BOFF")]
    BOff,
    /// 정지 (와이어 표기 "hault" 유지)
    #[serde(rename = "hault")]
    Halt,
    #[serde(rename = "LED_ON")]
    LedOn,
    #[serde(rename = "LED_OFF")]
    LedOff,
    #[serde(rename = "LED_TOGGLE")]
    LedToggle,
}

impl CommandToken {
    pub const ALL: [CommandToken; 12] = [
        CommandToken::Forward,
        CommandToken::Reverse,
        CommandToken::Left,
        CommandToken::Right,
        CommandToken::AOn,
        CommandToken::AOff,
        CommandToken::BOn,
        CommandToken::BOff,
        CommandToken::Halt,
        CommandToken::LedOn,
        CommandToken::LedOff,
        CommandToken::LedToggle,
    ];

    /// 와이어 표기
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandToken::Forward => "forward",
            CommandToken::Reverse => "reverse",
            CommandToken::Left => "left",
            CommandToken::Right => "right",
            CommandToken::AOn => "AON",
            CommandToken::AOff => "AOFF",
            CommandToken::BOn => "BON",
            CommandToken::BOff => "BOFF",
            CommandToken::Halt => "hault",
            CommandToken::LedOn => "LED_ON",
            CommandToken::LedOff => "LED_OFF",
            CommandToken::LedToggle => "LED_TOGGLE",
        }
    }

    /// LED 명령은 `message` 필드, 모터/버튼 명령은 `command` 필드로 전송된다
    pub fn is_led(&self) -> bool {
        matches!(
            self,
            CommandToken::LedOn | CommandToken::LedOff | CommandToken::LedToggle
        )
    }
}

impl fmt::Display for CommandToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommandToken {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CommandToken::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| CoreError::validation("command", format!("알 수 없는 명령: {s}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_wire_tokens() {
        assert_eq!("AOFF".parse::<CommandToken>().unwrap(), CommandToken::AOff);
        assert_eq!("hault".parse::<CommandToken>().unwrap(), CommandToken::Halt);
        assert!("aoff".parse::<CommandToken>().is_err());
    }

    #[test]
    fn serde_uses_wire_tokens() {
        assert_eq!(
            serde_json::to_string(&CommandToken::Halt).unwrap(),
            "\"hault\""
        );
        assert_eq!(
            serde_json::from_str::<CommandToken>("\"LED_TOGGLE\"").unwrap(),
            CommandToken::LedToggle
        );
    }

    #[test]
    fn led_classification() {
        assert!(CommandToken::LedOn.is_led());
        assert!(!CommandToken::AOn.is_led());
        assert!("halt".parse::<CommandToken>().is_err());
    }
}
