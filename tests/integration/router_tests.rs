//! Message router integration tests

use reflex_pad::core::config::Config;
use reflex_pad::core::events::{ResponseId, ResponseSender, ResponseValue};
use reflex_pad::hid::simulated::{SimulatedBackend, SIMULATED_SERIAL};
use reflex_pad::pad::model::{LimitField, SensorAdjustment, SensorLimits};
use reflex_pad::pad::profile::{JsonFileStorage, MemoryStorage, ProfileStorage};
use reflex_pad::router::{Command, DataProcessHandle, Message, PadContext};
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn context_with(storage: Box<dyn ProfileStorage>) -> PadContext {
    PadContext::new(&Config::default(), Arc::new(SimulatedBackend::new()), storage)
}

fn context() -> PadContext {
    context_with(Box::new(MemoryStorage::new()))
}

fn bump_threshold(panel: usize, sensor: usize, delta: i32) -> Command {
    Command::SensorUpdate(SensorAdjustment {
        panel,
        sensor,
        field: LimitField::Threshold,
        delta,
    })
}

fn adjust_hysteresis(panel: usize, sensor: usize, delta: i32) -> Command {
    Command::SensorUpdate(SensorAdjustment {
        panel,
        sensor,
        field: LimitField::Hysteresis,
        delta,
    })
}

#[test]
fn test_new_profile_stores_defaults_not_edits() {
    let mut ctx = context();
    ctx.handle(&Command::Init.to_message());

    assert!(ctx.handle(&bump_threshold(0, 0, 20).to_message()).is_empty());
    assert_eq!(ctx.pad.limits()[0][0].threshold, 50);
    assert!(ctx.pad.is_updated());

    let responses = ctx.handle(
        &Command::NewProfile {
            name: "Practice".to_string(),
        }
        .to_message(),
    );
    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0].id, ResponseId::ProfileNew);
    assert_eq!(
        responses[0].value,
        ResponseValue::ProfileName("Practice".to_string())
    );

    // set_default ran before the profile snapshot was taken
    let record = ctx.profiles.get("Practice").unwrap();
    assert_eq!(record.panels[0][0], SensorLimits::default());
    assert!(!ctx.pad.is_updated());
}

#[test]
fn test_new_profile_after_wide_hysteresis() {
    let mut ctx = context();
    ctx.handle(&Command::Init.to_message());
    ctx.handle(&bump_threshold(2, 3, 30).to_message());
    ctx.handle(&adjust_hysteresis(2, 3, -45).to_message());
    assert_eq!(
        ctx.pad.limits()[2][3],
        SensorLimits {
            threshold: 60,
            hysteresis: 50
        }
    );

    ctx.handle(
        &Command::NewProfile {
            name: "Fresh".to_string(),
        }
        .to_message(),
    );
    assert_eq!(ctx.pad.limits()[2][3], SensorLimits::default());
    let record = ctx.profiles.get("Fresh").unwrap();
    assert_eq!(record.panels[2][3], SensorLimits::default());
}

#[test]
fn test_select_profile_restores_low_threshold() {
    let mut ctx = context();
    ctx.handle(&Command::Init.to_message());
    ctx.handle(&bump_threshold(0, 1, -20).to_message());
    ctx.handle(&Command::SaveProfile.to_message());
    assert_eq!(
        ctx.pad.limits()[0][1],
        SensorLimits {
            threshold: 10,
            hysteresis: 5
        }
    );

    ctx.handle(&bump_threshold(0, 1, 50).to_message());
    ctx.handle(&adjust_hysteresis(0, 1, -35).to_message());
    assert_eq!(ctx.pad.limits()[0][1].hysteresis, 40);

    let responses = ctx.handle(
        &Command::SelectProfile {
            name: "Default".to_string(),
        }
        .to_message(),
    );
    assert_eq!(responses[0].id, ResponseId::ProfileLoaded);
    assert_eq!(
        ctx.pad.limits()[0][1],
        SensorLimits {
            threshold: 10,
            hysteresis: 5
        }
    );
}

#[test]
fn test_hysteresis_update_moves_opposite_to_delta() {
    let mut ctx = context();
    ctx.handle(&Command::Init.to_message());

    let message = Message::new(
        "GUI_sensor_update",
        vec![json!(1), json!(2), json!("hysteresis"), json!(-3)],
    );
    assert!(ctx.handle(&message).is_empty());
    assert_eq!(ctx.pad.limits()[1][2].hysteresis, 8);

    ctx.handle(&adjust_hysteresis(1, 2, 2).to_message());
    assert_eq!(ctx.pad.limits()[1][2].hysteresis, 6);
    assert_eq!(ctx.pad.limits()[1][2].threshold, 30);
    assert!(ctx.pad.is_updated());
}

#[test]
fn test_save_and_select_profile() {
    let mut ctx = context();
    ctx.handle(&Command::Init.to_message());
    ctx.handle(&bump_threshold(3, 2, 10).to_message());

    let responses = ctx.handle(&Command::SaveProfile.to_message());
    assert_eq!(responses[0].id, ResponseId::ProfileSaved);
    assert_eq!(responses[0].value, ResponseValue::Success(true));

    ctx.handle(
        &Command::NewProfile {
            name: "Soft".to_string(),
        }
        .to_message(),
    );
    assert_eq!(ctx.pad.limits()[3][2].threshold, 30);

    let responses = ctx.handle(
        &Command::SelectProfile {
            name: "Default".to_string(),
        }
        .to_message(),
    );
    assert_eq!(responses[0].id, ResponseId::ProfileLoaded);
    assert_eq!(ctx.pad.limits()[3][2].threshold, 40);

    // Unknown profile: no response
    assert!(ctx
        .handle(
            &Command::SelectProfile {
                name: "Missing".to_string()
            }
            .to_message()
        )
        .is_empty());
}

#[test]
fn test_rename_and_remove_profile() {
    let mut ctx = context();
    ctx.handle(&Command::Init.to_message());
    ctx.handle(
        &Command::NewProfile {
            name: "Hard".to_string(),
        }
        .to_message(),
    );

    let responses = ctx.handle(
        &Command::RenameProfile {
            from: "Hard".to_string(),
            to: "Stamina".to_string(),
        }
        .to_message(),
    );
    assert_eq!(responses[0].id, ResponseId::ProfileRenamed);
    assert_eq!(
        responses[0].value,
        ResponseValue::Renamed("Hard".to_string(), "Stamina".to_string())
    );

    let remove = |name: &str| Command::RemoveProfile {
        name: name.to_string(),
    };
    let responses = ctx.handle(&remove("Stamina").to_message());
    assert_eq!(responses[0].value, ResponseValue::Success(true));

    // The last profile stays
    let responses = ctx.handle(&remove("Default").to_message());
    assert_eq!(responses[0].id, ResponseId::ProfileRemoved);
    assert_eq!(responses[0].value, ResponseValue::Success(false));
    assert_eq!(ctx.profiles.names(), vec!["Default"]);
}

#[test]
fn test_unknown_and_malformed_commands() {
    let mut ctx = context();
    assert!(ctx.handle(&Message::new("GUI_not_a_command", vec![])).is_empty());
    assert!(ctx
        .handle(&Message::new("GUI_sensor_update", vec![json!(0), json!(0)]))
        .is_empty());
    assert!(!ctx.pad.is_updated());

    // Loop state is untouched and later commands still work
    let responses = ctx.handle(&Command::FrameReady.to_message());
    assert_eq!(responses[0].id, ResponseId::FrameData);
}

#[test]
fn test_connect_toggle_and_quit() {
    let mut ctx = context();
    let responses = ctx.handle(&Command::Refresh.to_message());
    assert_eq!(responses.len(), 1);
    assert_eq!(
        responses[0].value,
        ResponseValue::Serials(vec![SIMULATED_SERIAL.to_string()])
    );

    let connect = Command::Connect {
        serial: SIMULATED_SERIAL.to_string(),
    };
    let responses = ctx.handle(&connect.to_message());
    assert_eq!(responses[0].value, ResponseValue::Connected(true));
    assert!(ctx.sensors.baseline_pending());

    let responses = ctx.handle(&connect.to_message());
    assert_eq!(responses[0].value, ResponseValue::Connected(false));

    ctx.handle(&connect.to_message());
    assert!(ctx.handle(&Command::Quit.to_message()).is_empty());
    assert!(!ctx.session.is_connected());
}

#[test]
fn test_connect_after_init_without_refresh() {
    let mut ctx = context();
    let responses = ctx.handle(&Command::Init.to_message());
    assert_eq!(
        responses[0].value,
        ResponseValue::Serials(vec![SIMULATED_SERIAL.to_string()])
    );

    let responses = ctx.handle(
        &Command::Connect {
            serial: SIMULATED_SERIAL.to_string(),
        }
        .to_message(),
    );
    assert_eq!(responses[0].value, ResponseValue::Connected(true));
}

#[test]
fn test_unknown_serial_connect_reports_disconnected() {
    let mut ctx = context();
    let responses = ctx.handle(
        &Command::Connect {
            serial: "NOT-A-PAD".to_string(),
        }
        .to_message(),
    );
    assert_eq!(responses[0].id, ResponseId::PadConnected);
    assert_eq!(responses[0].value, ResponseValue::Connected(false));
}

#[test]
fn test_simulated_pad_produces_panel_events() {
    let mut ctx = context();
    ctx.handle(&Command::Refresh.to_message());
    ctx.handle(
        &Command::Connect {
            serial: SIMULATED_SERIAL.to_string(),
        }
        .to_message(),
    );

    let start = Instant::now();
    let mut pressed = false;
    while !pressed && start.elapsed() < Duration::from_secs(10) {
        pressed = ctx
            .pump(Instant::now())
            .iter()
            .any(|r| r.id == ResponseId::PanelEvent);
        std::thread::sleep(Duration::from_millis(1));
    }
    assert!(pressed);
    assert!(ctx.leds.snapshot_count() > 0);
}

#[test]
fn test_profiles_persist_to_disk() {
    let dir = tempfile::tempdir().unwrap();
    let storage = || Box::new(JsonFileStorage::in_dir(Some(dir.path())).unwrap());

    let mut ctx = context_with(storage());
    ctx.handle(&Command::Init.to_message());
    ctx.handle(&bump_threshold(1, 1, -10).to_message());
    ctx.handle(&Command::SaveProfile.to_message());
    drop(ctx);

    let mut ctx = context_with(storage());
    let responses = ctx.handle(&Command::Init.to_message());
    assert_eq!(
        responses[1].value,
        ResponseValue::ProfileNames(vec!["Default".to_string()])
    );
    assert_eq!(ctx.pad.limits()[1][1].threshold, 20);
}

#[test]
fn test_data_process_round_trip() {
    let (responses, mut rx) = ResponseSender::channel(32);
    let process = DataProcessHandle::spawn(context(), responses, Duration::from_millis(1)).unwrap();
    assert!(process.send(&Command::Init));

    let ids: Vec<ResponseId> = tokio_test::block_on(async {
        let mut ids = Vec::new();
        while ids.len() < 3 {
            match rx.recv().await {
                Some(response) => ids.push(response.id),
                None => break,
            }
        }
        ids
    });
    assert_eq!(
        ids,
        vec![
            ResponseId::AllPads,
            ResponseId::ProfileNames,
            ResponseId::FrameData
        ]
    );

    assert!(process.send(&Command::Quit));
    assert!(process.shutdown().is_some());
}
