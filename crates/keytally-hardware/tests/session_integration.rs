//! Integration tests for the session manager over mock transports.

use keytally_core::{IndicatorIndex, PressKind, Rgb};
use keytally_hardware::mock::MockConnector;
use keytally_hardware::{SessionConfig, SessionManager, SessionState};
use keytally_protocol::IndicatorCommand;
use std::time::Duration;

fn fast_config() -> SessionConfig {
    SessionConfig {
        reconnect_delay: Duration::from_millis(1),
        ..SessionConfig::default()
    }
}

#[tokio::test]
async fn test_starts_disconnected_and_connects_in_loop() {
    let (connector, plug) = MockConnector::new();
    let mut session = SessionManager::new(connector, fast_config());
    let state = vec![IndicatorCommand::set(IndicatorIndex::SLEEP, Rgb::BLUE)];

    assert_eq!(session.state(), SessionState::Disconnected);

    plug.fail_next(4);
    let device = plug.attach();
    device.send_line("BTN:8");

    let event = session.next_event(&state).await;
    assert_eq!(event.button.as_u8(), 8);
    assert_eq!(event.kind, PressKind::Press);
    assert!(session.is_connected());
    assert_eq!(
        device.written_commands(),
        vec![
            IndicatorCommand::CLEAR,
            IndicatorCommand::set(IndicatorIndex::SLEEP, Rgb::BLUE)
        ]
    );
}

#[tokio::test]
async fn test_every_reconnect_replays_current_state() {
    let (connector, plug) = MockConnector::new();
    let first = plug.attach();
    let mut session = SessionManager::new(connector, fast_config());

    let mut state: Vec<IndicatorCommand> = Vec::new();
    session.connect(&state).await.unwrap();
    assert_eq!(first.written_lines(), vec!["LED:ALL:0,0,0"]);

    state.push(IndicatorCommand::set(IndicatorIndex::LAYER, Rgb::YELLOW));
    first.fail_read("gone");
    plug.fail_next(1);
    let second = plug.attach();
    second.send_line("BTN:1");

    session.next_event(&state).await;
    assert_eq!(
        second.written_lines(),
        vec!["LED:ALL:0,0,0", "LED:7:255,255,0"]
    );

    state.clear();
    second.fail_read("gone again");
    let third = plug.attach();
    third.send_line("BTN:9:LONG");

    let event = session.next_event(&state).await;
    assert_eq!(event.kind, PressKind::LongPress);
    assert_eq!(third.written_lines(), vec!["LED:ALL:0,0,0"]);
    assert_eq!(session.reconnects(), 2);
}

#[tokio::test]
async fn test_send_while_disconnected_returns_false() {
    let (connector, _plug) = MockConnector::new();
    let mut session = SessionManager::new(connector, fast_config());

    assert!(!session.send(&IndicatorCommand::StopAnimation).await);
    assert!(!session.send_all(&[IndicatorCommand::CLEAR]).await);
}
