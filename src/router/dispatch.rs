//! Command to handler wiring
//!
//! Every command maps to an ordered list of handlers. Handlers run in list
//! order against the same [`PadContext`], so a later handler sees what an
//! earlier one changed. A handler's value is forwarded under the response id
//! registered for that handler; handlers with no response id are silent.

use super::command::{Command, CommandKind};
use super::process::PadContext;
use crate::core::events::{Response, ResponseId, ResponseValue};
use tracing::{debug, warn};

/// Operations a command can trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Handler {
    GetAllPads,
    InitialiseProfile,
    GetModelData,
    TogglePadConnection,
    EnumeratePads,
    DisconnectPad,
    SetSensor,
    SetDefault,
    CreateNewProfile,
    SaveUserProfile,
    LoadUserProfile,
    RenameUserProfile,
    RemoveUserProfile,
    Rebaseline,
}

/// Ordered handler list for a command
pub fn handlers(kind: CommandKind) -> &'static [Handler] {
    use Handler::*;
    match kind {
        CommandKind::Init => &[GetAllPads, InitialiseProfile, GetModelData],
        CommandKind::FrameReady => &[GetModelData],
        CommandKind::Connect => &[TogglePadConnection],
        CommandKind::Refresh => &[EnumeratePads, GetAllPads],
        CommandKind::Quit => &[DisconnectPad],
        CommandKind::SensorUpdate => &[SetSensor],
        CommandKind::NewProfile => &[SetDefault, CreateNewProfile],
        CommandKind::SaveProfile => &[SaveUserProfile],
        CommandKind::SelectProfile => &[LoadUserProfile],
        CommandKind::RenameProfile => &[RenameUserProfile],
        CommandKind::RemoveProfile => &[RemoveUserProfile],
        CommandKind::Rebaseline => &[Rebaseline],
    }
}

impl Handler {
    /// Response id a produced value is sent under
    pub fn response_id(&self) -> Option<ResponseId> {
        match self {
            Handler::GetAllPads => Some(ResponseId::AllPads),
            Handler::InitialiseProfile => Some(ResponseId::ProfileNames),
            Handler::GetModelData => Some(ResponseId::FrameData),
            Handler::TogglePadConnection => Some(ResponseId::PadConnected),
            Handler::CreateNewProfile => Some(ResponseId::ProfileNew),
            Handler::SaveUserProfile => Some(ResponseId::ProfileSaved),
            Handler::LoadUserProfile => Some(ResponseId::ProfileLoaded),
            Handler::RenameUserProfile => Some(ResponseId::ProfileRenamed),
            Handler::RemoveUserProfile => Some(ResponseId::ProfileRemoved),
            Handler::EnumeratePads
            | Handler::DisconnectPad
            | Handler::SetSensor
            | Handler::SetDefault
            | Handler::Rebaseline => None,
        }
    }

    /// Run the handler; `None` means no response
    pub fn call(&self, ctx: &mut PadContext, command: &Command) -> Option<ResponseValue> {
        match (self, command) {
            (Handler::GetAllPads, _) => Some(ResponseValue::Serials(ctx.session.serials())),

            (Handler::InitialiseProfile, _) => match ctx.profiles.initialise(&mut ctx.pad) {
                Ok(names) => Some(ResponseValue::ProfileNames(names)),
                Err(e) => {
                    warn!("Failed to initialise profiles: {}", e);
                    None
                }
            },

            (Handler::GetModelData, _) => Some(ResponseValue::Frame(Box::new(ctx.pad.clone()))),

            (Handler::TogglePadConnection, Command::Connect { serial }) => {
                match ctx.session.toggle(serial) {
                    Ok(connected) => {
                        if connected {
                            ctx.sensors.request_baseline();
                            ctx.leds.reset();
                        }
                        Some(ResponseValue::Connected(connected))
                    }
                    Err(e) => {
                        warn!("Failed to connect to {}: {}", serial, e);
                        Some(ResponseValue::Connected(ctx.session.is_connected()))
                    }
                }
            }

            (Handler::EnumeratePads, _) => {
                if let Err(e) = ctx.session.enumerate() {
                    warn!("Failed to enumerate pads: {}", e);
                }
                None
            }

            (Handler::DisconnectPad, _) => {
                ctx.session.disconnect();
                None
            }

            (Handler::SetSensor, Command::SensorUpdate(adjustment)) => {
                if !ctx.pad.adjust_sensor(*adjustment) {
                    warn!(
                        "No sensor {} on panel {}",
                        adjustment.sensor, adjustment.panel
                    );
                }
                None
            }

            (Handler::SetDefault, _) => {
                ctx.pad.set_default();
                None
            }

            (Handler::CreateNewProfile, Command::NewProfile { name }) => {
                match ctx.profiles.create(name, &ctx.pad) {
                    Ok(created) => Some(ResponseValue::ProfileName(created)),
                    Err(e) => {
                        warn!("Failed to create profile {:?}: {}", name, e);
                        None
                    }
                }
            }

            (Handler::SaveUserProfile, _) => match ctx.profiles.save(&mut ctx.pad) {
                Ok(_) => Some(ResponseValue::Success(true)),
                Err(e) => {
                    warn!("Failed to save profile: {}", e);
                    Some(ResponseValue::Success(false))
                }
            },

            (Handler::LoadUserProfile, Command::SelectProfile { name }) => {
                match ctx.profiles.load(name, &mut ctx.pad) {
                    Ok(loaded) => Some(ResponseValue::ProfileName(loaded)),
                    Err(e) => {
                        warn!("Failed to load profile {:?}: {}", name, e);
                        None
                    }
                }
            }

            (Handler::RenameUserProfile, Command::RenameProfile { from, to }) => {
                match ctx.profiles.rename(from, to) {
                    Ok((old, new)) => Some(ResponseValue::Renamed(old, new)),
                    Err(e) => {
                        warn!("Failed to rename profile {:?}: {}", from, e);
                        None
                    }
                }
            }

            (Handler::RemoveUserProfile, Command::RemoveProfile { name }) => {
                match ctx.profiles.remove(name) {
                    Ok(()) => Some(ResponseValue::Success(true)),
                    Err(e) => {
                        warn!("Failed to remove profile {:?}: {}", name, e);
                        Some(ResponseValue::Success(false))
                    }
                }
            }

            (Handler::Rebaseline, _) => {
                ctx.sensors.request_baseline();
                None
            }

            (handler, command) => {
                debug!("{:?} does not apply to {:?}", handler, command.kind());
                None
            }
        }
    }
}

/// Run every handler for `command` in order and collect their responses
pub fn dispatch(ctx: &mut PadContext, command: &Command) -> Vec<Response> {
    let mut responses = Vec::new();
    for handler in handlers(command.kind()) {
        let Some(value) = handler.call(ctx, command) else {
            continue;
        };
        if let Some(id) = handler.response_id() {
            responses.push(Response::new(id, value));
        }
    }
    responses
}
