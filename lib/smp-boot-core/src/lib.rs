// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The firmware-upgrade transport and image-state core: an SMP dispatcher
//! that accepts chunked image uploads, reports and mutates boot-slot
//! state, and triggers a controlled reboot.
//!
//! This crate owns no hardware: a board-support crate supplies a
//! [`config::BootConfig`] and implementations of the collaborator traits in
//! [`collab`] (transport, reboot, clock) and of [`smp_flash::RawFlash`] /
//! [`smp_image::SwapOracle`] / [`smp_image::ImageValidator`] /
//! [`smp_image::PendingSetter`], then drives [`dispatch::Dispatcher::run`]
//! from its main loop.

#![cfg_attr(not(test), no_std)]

pub mod collab;
pub mod config;
mod cursor;
pub mod dispatch;
mod error;
mod ils;
mod keys;
mod response;
mod sip;
mod trace;
mod usm;

pub use config::BootConfig;
pub use cursor::UploadCursor;
pub use dispatch::Dispatcher;
pub use error::HandlerError;
pub use trace::{Trace, TraceLog};
