//! Router module - typed commands, the handler table and the data process

pub mod command;
pub mod dispatch;
pub mod process;

pub use command::{Command, CommandError, CommandKind, Message};
pub use dispatch::{dispatch, handlers, Handler};
pub use process::{DataProcess, DataProcessHandle, PadContext};
