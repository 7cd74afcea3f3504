use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};

use crate::session::{ScanSlot, SessionCommand};

/// Requests to the shell's camera. Decoded QR text does not flow through this
/// capability: the shell reports each decode as `Event::CodeDecoded` while a
/// slot is scanning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum CameraOperation {
    StartScan { slot: ScanSlot },
    PauseScan { slot: ScanSlot },
    ResumeScan { slot: ScanSlot },
    StopScan { slot: ScanSlot },
    CapturePhoto,
}

impl From<SessionCommand> for CameraOperation {
    fn from(command: SessionCommand) -> Self {
        match command {
            SessionCommand::Start(slot) => Self::StartScan { slot },
            SessionCommand::Pause(slot) => Self::PauseScan { slot },
            SessionCommand::Resume(slot) => Self::ResumeScan { slot },
            SessionCommand::Stop(slot) => Self::StopScan { slot },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum CameraOutput {
    /// The scanner for the slot is decoding frames.
    Scanning,
    /// A resume found no usable scanner handle.
    HandleLost,
    /// Permission denied or no camera present.
    Unavailable { reason: String },
    Photo { data: Vec<u8> },
    Cancelled,
    Done,
}

impl Operation for CameraOperation {
    type Output = CameraOutput;
}

pub struct Camera<E> {
    context: CapabilityContext<CameraOperation, E>,
}

impl<Ev> Capability<Ev> for Camera<Ev> {
    type Operation = CameraOperation;
    type MappedSelf<MappedEv> = Camera<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        Camera::new(self.context.map_event(f))
    }
}

impl<E> Camera<E>
where
    E: 'static,
{
    pub fn new(context: CapabilityContext<CameraOperation, E>) -> Self {
        Self { context }
    }

    /// Forwards a session command. Start and resume report back how the
    /// acquisition went; pause and stop are fire-and-forget.
    pub fn session<F>(&self, command: SessionCommand, make_event: F)
    where
        F: FnOnce(ScanSlot, CameraOutput) -> E + Send + 'static,
    {
        let ctx = self.context.clone();
        match command {
            SessionCommand::Start(slot) | SessionCommand::Resume(slot) => {
                self.context.spawn(async move {
                    let output = ctx.request_from_shell(command.into()).await;
                    ctx.update_app(make_event(slot, output));
                });
            }
            SessionCommand::Pause(_) | SessionCommand::Stop(_) => {
                self.context.spawn(async move {
                    ctx.notify_shell(command.into()).await;
                });
            }
        }
    }

    pub fn capture_photo<F>(&self, make_event: F)
    where
        F: FnOnce(CameraOutput) -> E + Send + 'static,
    {
        let ctx = self.context.clone();
        self.context.spawn(async move {
            let output = ctx.request_from_shell(CameraOperation::CapturePhoto).await;
            ctx.update_app(make_event(output));
        });
    }
}
