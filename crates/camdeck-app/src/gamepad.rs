//! 게임패드 입력.
//!
//! `gilrs`로 게임패드 이벤트를 폴링해 바인딩된 버튼의 누름/뗌을 세션 명령으로 넘긴다.
//! gilrs 컨텍스트는 전용 OS 스레드가 소유하고, 명령은 채널로 런타임에 전달한다.

use camdeck_session::controller::{SessionHandle, UserCommand};
use camdeck_session::input::{GamepadButton, KeyPhase};
use gilrs::{Button, EventType, Gilrs};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// 이벤트 큐 폴링 간격 (약 60Hz)
const POLL_INTERVAL: Duration = Duration::from_millis(16);

/// gilrs 버튼 → 바인딩된 버튼
pub fn bound_button(button: Button) -> Option<GamepadButton> {
    match button {
        Button::DPadUp => Some(GamepadButton::DPadUp),
        Button::DPadDown => Some(GamepadButton::DPadDown),
        Button::DPadLeft => Some(GamepadButton::DPadLeft),
        Button::DPadRight => Some(GamepadButton::DPadRight),
        Button::South => Some(GamepadButton::South),
        Button::East => Some(GamepadButton::East),
        _ => None,
    }
}

/// 버튼 이벤트 → 세션 명령 (바인딩 없는 버튼은 무시)
pub fn pad_command(button: Button, phase: KeyPhase) -> Option<UserCommand> {
    bound_button(button).map(|button| UserCommand::Gamepad { button, phase })
}

fn button_phase(event: &EventType) -> Option<(Button, KeyPhase)> {
    match event {
        EventType::ButtonPressed(button, _) => Some((*button, KeyPhase::Press)),
        EventType::ButtonReleased(button, _) => Some((*button, KeyPhase::Release)),
        _ => None,
    }
}

/// 폴링 스레드 시작
///
/// gilrs 초기화에 실패하면 경고만 남기고 채널을 닫는다. 수신 측이 닫히면 스레드도 끝난다.
pub fn spawn_gamepad_reader() -> mpsc::Receiver<UserCommand> {
    let (tx, rx) = mpsc::channel(16);
    std::thread::spawn(move || {
        let mut gilrs = match Gilrs::new() {
            Ok(gilrs) => gilrs,
            Err(e) => {
                warn!("게임패드 초기화 실패, 게임패드 입력 비활성: {e}");
                return;
            }
        };
        for (_, pad) in gilrs.gamepads() {
            info!("게임패드 감지: {}", pad.name());
        }

        loop {
            while let Some(event) = gilrs.next_event() {
                match event.event {
                    EventType::Connected => {
                        info!("게임패드 연결: {}", gilrs.gamepad(event.id).name());
                    }
                    EventType::Disconnected => info!("게임패드 분리: {:?}", event.id),
                    ref other => {
                        let Some((button, phase)) = button_phase(other) else {
                            continue;
                        };
                        let Some(command) = pad_command(button, phase) else {
                            continue;
                        };
                        debug!("게임패드 입력: {button:?} {phase:?}");
                        if tx.blocking_send(command).is_err() {
                            return;
                        }
                    }
                }
            }
            if tx.is_closed() {
                return;
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    });
    rx
}

/// 게임패드 명령을 세션으로 전달 (세션이 끝나거나 입력 채널이 닫힐 때까지)
pub async fn forward(mut commands: mpsc::Receiver<UserCommand>, handle: SessionHandle) {
    while let Some(command) = commands.recv().await {
        if let Err(e) = handle.send(command).await {
            warn!("게임패드 명령 전달 실패: {e}");
            break;
        }
    }
    debug!("게임패드 입력 종료");
}
