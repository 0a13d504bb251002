//! 콘솔 명령 파서.
//!
//! 표준 입력 한 줄을 세션 명령으로 변환한다.

use camdeck_core::error::CoreError;
use camdeck_core::models::command::CommandToken;
use camdeck_core::models::settings::{CameraParams, MotionParams, Resolution, SettingsPatch};
use camdeck_session::controller::UserCommand;
use camdeck_session::input::{Key, KeyPhase};
use serde_json::Value;

/// 콘솔 도움말
pub const HELP: &str = "\
명령:
  connect <host> <port>     서버 연결
  disconnect                연결 종료
  cameras                   카메라 목록
  status                    현재 상태
  select <id>               카메라 선택
  fetch                     선택 카메라 설정 요청
  set <field> <value>       센서 설정 편집 (예: set quality 10, set resolution VGA)
  motion <field> <value>    모션 감지 설정 편집 (minArea, threshold, blurSize, dilation)
  apply                     편집한 설정을 서버로 전송
  rename <name>             선택 카메라 이름 변경
  led on|off|toggle         LED 제어
  forward|reverse|left|right|hault|AON|AOFF|BON|BOFF
                            모터/버튼 명령
  up|down|left|right|a|b    키 누름, `release <key>`로 키 뗌
  quit                      종료";

/// 해석된 콘솔 입력
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    /// 세션으로 전달할 명령
    Session(UserCommand),
    /// 카메라 목록 출력
    Cameras,
    /// 상태 요약 출력
    Status,
    Help,
    Quit,
}

/// 한 줄 해석 (빈 줄이면 `None`)
pub fn parse_line(line: &str) -> Result<Option<ConsoleCommand>, CoreError> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Ok(None);
    };
    let args: Vec<&str> = words.collect();

    let command = match head {
        "quit" | "exit" => ConsoleCommand::Quit,
        "help" | "?" => ConsoleCommand::Help,
        "cameras" | "ls" => ConsoleCommand::Cameras,
        "status" => ConsoleCommand::Status,
        "connect" => match args.as_slice() {
            [host, port] => session(UserCommand::Connect {
                host: host.to_string(),
                port: port.to_string(),
            }),
            _ => return Err(usage("connect <host> <port>")),
        },
        "disconnect" => session(UserCommand::Disconnect),
        "select" => match args.as_slice() {
            [id] => session(UserCommand::SelectCamera(id.to_string())),
            _ => return Err(usage("select <id>")),
        },
        "fetch" => session(UserCommand::RequestSettings),
        "apply" => session(UserCommand::ApplySettings),
        "set" => session(UserCommand::EditSettings(camera_patch(&args)?)),
        "motion" => session(UserCommand::EditSettings(motion_patch(&args)?)),
        // 이름에는 공백이 들어갈 수 있다
        "rename" => {
            if args.is_empty() {
                return Err(usage("rename <name>"));
            }
            session(UserCommand::RenameCamera(args.join(" ")))
        }
        "led" => {
            let token = match args.as_slice() {
                ["on"] => CommandToken::LedOn,
                ["off"] => CommandToken::LedOff,
                ["toggle"] => CommandToken::LedToggle,
                _ => return Err(usage("led on|off|toggle")),
            };
            session(UserCommand::Command(token))
        }
        "press" | "release" => {
            let [name] = args.as_slice() else {
                return Err(usage("press|release <key>"));
            };
            let phase = if head == "press" {
                KeyPhase::Press
            } else {
                KeyPhase::Release
            };
            session(UserCommand::Key {
                key: name.parse::<Key>()?,
                phase,
            })
        }
        other => {
            if !args.is_empty() {
                return Err(unknown(other));
            }
            if let Ok(token) = other.parse::<CommandToken>() {
                session(UserCommand::Command(token))
            } else if let Ok(key) = other.parse::<Key>() {
                session(UserCommand::Key {
                    key,
                    phase: KeyPhase::Press,
                })
            } else {
                return Err(unknown(other));
            }
        }
    };
    Ok(Some(command))
}

fn session(command: UserCommand) -> ConsoleCommand {
    ConsoleCommand::Session(command)
}

fn usage(form: &str) -> CoreError {
    CoreError::validation("command", format!("사용법: {form}"))
}

fn unknown(word: &str) -> CoreError {
    CoreError::validation("command", format!("알 수 없는 명령: {word} (help 참고)"))
}

fn camera_patch(args: &[&str]) -> Result<SettingsPatch, CoreError> {
    let [field, raw] = args else {
        return Err(usage("set <field> <value>"));
    };
    if !CameraParams::has_field(field) {
        return Err(CoreError::validation(
            "camera",
            format!("알 수 없는 필드: {field}"),
        ));
    }
    let value = if *field == "resolution" {
        Value::from(raw.parse::<Resolution>()?.as_str())
    } else {
        integer(field, raw)?
    };
    Ok(SettingsPatch::camera_field(field, value))
}

fn motion_patch(args: &[&str]) -> Result<SettingsPatch, CoreError> {
    let [field, raw] = args else {
        return Err(usage("motion <field> <value>"));
    };
    if !MotionParams::has_field(field) {
        return Err(CoreError::validation(
            "motion",
            format!("알 수 없는 필드: {field}"),
        ));
    }
    Ok(SettingsPatch::motion_field(field, integer(field, raw)?))
}

fn integer(field: &str, raw: &str) -> Result<Value, CoreError> {
    raw.parse::<i64>()
        .map(Value::from)
        .map_err(|_| CoreError::validation(field, format!("정수가 아님: {raw}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(line: &str) -> ConsoleCommand {
        parse_line(line).unwrap().unwrap()
    }

    #[test]
    fn blank_line_is_ignored() {
        assert_eq!(parse_line("   ").unwrap(), None);
    }

    #[test]
    fn connect_keeps_raw_port() {
        assert_eq!(
            parsed("connect 192.168.0.156 5000"),
            ConsoleCommand::Session(UserCommand::Connect {
                host: "192.168.0.156".to_string(),
                port: "5000".to_string(),
            })
        );
        assert!(parse_line("connect onlyhost").is_err());
    }

    #[test]
    fn settings_edits_are_typed() {
        assert_eq!(
            parsed("set resolution vga"),
            ConsoleCommand::Session(UserCommand::EditSettings(SettingsPatch::camera_field(
                "resolution",
                "VGA"
            )))
        );
        assert_eq!(
            parsed("motion blurSize 20"),
            ConsoleCommand::Session(UserCommand::EditSettings(SettingsPatch::motion_field(
                "blurSize", 20
            )))
        );
        assert!(parse_line("set quality high").is_err());
        assert!(parse_line("set shutter 3").is_err());
        assert!(parse_line("motion quality 3").is_err());
    }

    #[test]
    fn motor_words_and_keys() {
        assert_eq!(
            parsed("hault"),
            ConsoleCommand::Session(UserCommand::Command(CommandToken::Halt))
        );
        assert_eq!(
            parsed("BON"),
            ConsoleCommand::Session(UserCommand::Command(CommandToken::BOn))
        );
        assert_eq!(
            parsed("up"),
            ConsoleCommand::Session(UserCommand::Key {
                key: Key::ArrowUp,
                phase: KeyPhase::Press,
            })
        );
        assert_eq!(
            parsed("release a"),
            ConsoleCommand::Session(UserCommand::Key {
                key: Key::A,
                phase: KeyPhase::Release,
            })
        );
        assert_eq!(
            parsed("led toggle"),
            ConsoleCommand::Session(UserCommand::Command(CommandToken::LedToggle))
        );
        assert!(parse_line("jump").is_err());
    }

    #[test]
    fn rename_joins_words() {
        assert_eq!(
            parsed("rename Front Door"),
            ConsoleCommand::Session(UserCommand::RenameCamera("Front Door".to_string()))
        );
        assert!(parse_line("rename").is_err());
        assert_eq!(parsed("quit"), ConsoleCommand::Quit);
    }
}
