// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use smp_flash::FlashError;
use smp_image::{ManifestError, PendingError};
use smp_wire::ResultCode;

/// Everything a handler can fail with, folded to a wire `rc` only at the
/// outermost boundary — never earlier, so a handler that wants to log the
/// precise cause still can.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HandlerError {
    Flash(FlashError),
    Manifest(ManifestError),
    Validation,
    NotFound,
    NoMemory,
    Unsupported,
    InvalidRequest,
}

impl From<FlashError> for HandlerError {
    fn from(e: FlashError) -> Self {
        HandlerError::Flash(e)
    }
}

impl From<ManifestError> for HandlerError {
    fn from(e: ManifestError) -> Self {
        HandlerError::Manifest(e)
    }
}

impl From<PendingError> for HandlerError {
    fn from(_: PendingError) -> Self {
        HandlerError::InvalidRequest
    }
}

impl HandlerError {
    /// Folds this error to the wire result-code taxonomy. There is no
    /// finer-grained wire representation for flash/manifest failures —
    /// they all present as `EINVAL` to the peer, matching the
    /// propagation policy.
    pub fn to_rc(self) -> ResultCode {
        match self {
            HandlerError::Flash(_) => ResultCode::InvalidRequest,
            HandlerError::Manifest(_) => ResultCode::NotFound,
            HandlerError::Validation => ResultCode::InvalidRequest,
            HandlerError::NotFound => ResultCode::NotFound,
            HandlerError::NoMemory => ResultCode::NoMemory,
            HandlerError::Unsupported => ResultCode::Unsupported,
            HandlerError::InvalidRequest => ResultCode::InvalidRequest,
        }
    }
}
