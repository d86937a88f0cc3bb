mod envelope;
mod event;
mod frame;

pub(crate) use envelope::*;
pub(crate) use event::*;
pub(crate) use frame::*;
