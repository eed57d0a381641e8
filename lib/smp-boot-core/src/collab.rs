// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Named external collaborators the dispatch loop depends on but never
//! implements: the datagram socket, the reboot primitive, and the
//! post-reset delay. These stand in for the board-support layer the way
//! `task_net_api::Net` and `userlib::hl::sleep_for` stand in for the kernel
//! in the teacher's drivers.

/// A failure receiving or sending a datagram.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransportError {
    /// The receive deadline elapsed with no datagram available.
    Timeout,
    /// Some other I/O failure; the dispatch loop logs it and keeps going.
    Other,
}

/// The datagram socket, modeled directly rather than through an IPC
/// client: this crate doesn't run atop a microkernel, so there is no task
/// boundary to cross.
pub trait Transport {
    /// An opaque peer address, recorded on receive and echoed back on the
    /// matching reply.
    type Addr: Copy;

    /// Waits up to `timeout_ms` for a datagram. `Ok(None)` means the
    /// timeout elapsed with nothing to deliver; distinct from
    /// `Err(TransportError::Timeout)`, which a caller may also choose to
    /// fold into `Ok(None)`.
    fn recv_from(
        &mut self,
        buf: &mut [u8],
        timeout_ms: u32,
    ) -> Result<Option<(usize, Self::Addr)>, TransportError>;

    fn send_to(&mut self, buf: &[u8], addr: Self::Addr) -> Result<(), TransportError>;
}

/// The hardware reboot primitive. Never returns.
pub trait Reboot {
    fn reboot(&self) -> !;
}

/// The post-reset delay, and any other cooperative sleep the dispatch loop
/// needs. Kept as a trait so tests can use a no-op clock instead of a busy
/// loop.
pub trait Clock {
    fn sleep_ms(&self, ms: u32);
}

/// Optional progress indication for long-running uploads. The default
/// no-op implementation on `()` means an embedder who doesn't care about
/// progress doesn't have to write one.
pub trait ProgressSink {
    fn on_progress(&mut self, percent: u8);
}

impl ProgressSink for () {
    fn on_progress(&mut self, _percent: u8) {}
}
