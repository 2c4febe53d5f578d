//! Inbound commands
//!
//! The presentation layer sends untyped `(id, args)` messages. Parsing turns
//! them into a typed [`Command`], checking the argument count and types
//! fixed for each identifier.

use crate::pad::model::{LimitField, SensorAdjustment};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Raw message as exchanged over the command channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    #[serde(default)]
    pub args: Vec<Value>,
}

impl Message {
    pub fn new(id: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            id: id.into(),
            args,
        }
    }
}

/// Payload validation failures
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("{command} expects {expected} argument(s), got {actual}")]
    Arity {
        command: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("{command} argument {index}: {reason}")]
    Argument {
        command: &'static str,
        index: usize,
        reason: String,
    },
}

/// Inbound command identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Init,
    FrameReady,
    Connect,
    Refresh,
    Quit,
    SensorUpdate,
    NewProfile,
    SaveProfile,
    SelectProfile,
    RenameProfile,
    RemoveProfile,
    Rebaseline,
}

impl CommandKind {
    pub const ALL: [CommandKind; 12] = [
        CommandKind::Init,
        CommandKind::FrameReady,
        CommandKind::Connect,
        CommandKind::Refresh,
        CommandKind::Quit,
        CommandKind::SensorUpdate,
        CommandKind::NewProfile,
        CommandKind::SaveProfile,
        CommandKind::SelectProfile,
        CommandKind::RenameProfile,
        CommandKind::RemoveProfile,
        CommandKind::Rebaseline,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            CommandKind::Init => "GUI_init_window",
            CommandKind::FrameReady => "GUI_frame_ready",
            CommandKind::Connect => "GUI_connect_pad",
            CommandKind::Refresh => "GUI_refresh_pads",
            CommandKind::Quit => "GUI_quit",
            CommandKind::SensorUpdate => "GUI_sensor_update",
            CommandKind::NewProfile => "GUI_new_profile",
            CommandKind::SaveProfile => "GUI_save_profile",
            CommandKind::SelectProfile => "GUI_select_profile",
            CommandKind::RenameProfile => "GUI_rename_profile",
            CommandKind::RemoveProfile => "GUI_remove_profile",
            CommandKind::Rebaseline => "GUI_rebaseline",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.id() == id)
    }

    /// Number of positional arguments the command takes
    pub fn arity(&self) -> usize {
        match self {
            CommandKind::Connect
            | CommandKind::NewProfile
            | CommandKind::SelectProfile
            | CommandKind::RemoveProfile => 1,
            CommandKind::RenameProfile => 2,
            CommandKind::SensorUpdate => 4,
            _ => 0,
        }
    }
}

/// A validated inbound command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Init,
    FrameReady,
    Connect { serial: String },
    Refresh,
    Quit,
    SensorUpdate(SensorAdjustment),
    NewProfile { name: String },
    SaveProfile,
    SelectProfile { name: String },
    RenameProfile { from: String, to: String },
    RemoveProfile { name: String },
    Rebaseline,
}

impl Command {
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::Init => CommandKind::Init,
            Command::FrameReady => CommandKind::FrameReady,
            Command::Connect { .. } => CommandKind::Connect,
            Command::Refresh => CommandKind::Refresh,
            Command::Quit => CommandKind::Quit,
            Command::SensorUpdate(_) => CommandKind::SensorUpdate,
            Command::NewProfile { .. } => CommandKind::NewProfile,
            Command::SaveProfile => CommandKind::SaveProfile,
            Command::SelectProfile { .. } => CommandKind::SelectProfile,
            Command::RenameProfile { .. } => CommandKind::RenameProfile,
            Command::RemoveProfile { .. } => CommandKind::RemoveProfile,
            Command::Rebaseline => CommandKind::Rebaseline,
        }
    }

    /// Validate a raw message; unknown identifiers yield `Ok(None)`
    pub fn parse(message: &Message) -> Result<Option<Command>, CommandError> {
        let Some(kind) = CommandKind::from_id(&message.id) else {
            return Ok(None);
        };
        let args = Args::new(kind, &message.args)?;

        let command = match kind {
            CommandKind::Init => Command::Init,
            CommandKind::FrameReady => Command::FrameReady,
            CommandKind::Connect => Command::Connect {
                serial: args.string(0)?,
            },
            CommandKind::Refresh => Command::Refresh,
            CommandKind::Quit => Command::Quit,
            CommandKind::SensorUpdate => Command::SensorUpdate(SensorAdjustment {
                panel: args.index(0)?,
                sensor: args.index(1)?,
                field: args.field(2)?,
                delta: args.delta(3)?,
            }),
            CommandKind::NewProfile => Command::NewProfile {
                name: args.string(0)?,
            },
            CommandKind::SaveProfile => Command::SaveProfile,
            CommandKind::SelectProfile => Command::SelectProfile {
                name: args.string(0)?,
            },
            CommandKind::RenameProfile => Command::RenameProfile {
                from: args.string(0)?,
                to: args.string(1)?,
            },
            CommandKind::RemoveProfile => Command::RemoveProfile {
                name: args.string(0)?,
            },
            CommandKind::Rebaseline => Command::Rebaseline,
        };
        Ok(Some(command))
    }

    /// Encode back into a raw message
    pub fn to_message(&self) -> Message {
        let args = match self {
            Command::Connect { serial } => vec![Value::from(serial.as_str())],
            Command::SensorUpdate(adj) => vec![
                Value::from(adj.panel),
                Value::from(adj.sensor),
                Value::from(match adj.field {
                    LimitField::Threshold => "threshold",
                    LimitField::Hysteresis => "hysteresis",
                }),
                Value::from(adj.delta),
            ],
            Command::NewProfile { name }
            | Command::SelectProfile { name }
            | Command::RemoveProfile { name } => vec![Value::from(name.as_str())],
            Command::RenameProfile { from, to } => {
                vec![Value::from(from.as_str()), Value::from(to.as_str())]
            }
            _ => Vec::new(),
        };
        Message::new(self.kind().id(), args)
    }
}

struct Args<'a> {
    command: &'static str,
    values: &'a [Value],
}

impl<'a> Args<'a> {
    fn new(kind: CommandKind, values: &'a [Value]) -> Result<Self, CommandError> {
        if values.len() != kind.arity() {
            return Err(CommandError::Arity {
                command: kind.id(),
                expected: kind.arity(),
                actual: values.len(),
            });
        }
        Ok(Self {
            command: kind.id(),
            values,
        })
    }

    fn error(&self, index: usize, reason: impl Into<String>) -> CommandError {
        CommandError::Argument {
            command: self.command,
            index,
            reason: reason.into(),
        }
    }

    fn value(&self, index: usize) -> Result<&Value, CommandError> {
        self.values
            .get(index)
            .ok_or_else(|| self.error(index, "missing"))
    }

    fn string(&self, index: usize) -> Result<String, CommandError> {
        self.value(index)?
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| self.error(index, "expected a string"))
    }

    fn index(&self, index: usize) -> Result<usize, CommandError> {
        self.value(index)?
            .as_u64()
            .and_then(|v| usize::try_from(v).ok())
            .ok_or_else(|| self.error(index, "expected a non-negative integer"))
    }

    fn delta(&self, index: usize) -> Result<i32, CommandError> {
        self.value(index)?
            .as_i64()
            .and_then(|v| i32::try_from(v).ok())
            .ok_or_else(|| self.error(index, "expected an integer"))
    }

    /// `"threshold"`/`"hysteresis"`, or `0`/`1`
    fn field(&self, index: usize) -> Result<LimitField, CommandError> {
        match self.value(index)? {
            Value::String(s) if s == "threshold" => Ok(LimitField::Threshold),
            Value::String(s) if s == "hysteresis" => Ok(LimitField::Hysteresis),
            Value::Number(n) if n.as_u64() == Some(0) => Ok(LimitField::Threshold),
            Value::Number(n) if n.as_u64() == Some(1) => Ok(LimitField::Hysteresis),
            other => Err(self.error(index, format!("unknown sensor field {other}"))),
        }
    }
}
