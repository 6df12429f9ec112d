//! Length discovery for URL attachments.
//!
//! ```text
//! Unknown -> Probing -> KnownSmall | KnownLarge | UnknownBuffering -> Terminal
//! ```
//!
//! The probe (HEAD) and the download's own headers are the two chances to
//! learn the length before bytes arrive. Each transition is a pure
//! function so the machine is testable without a network.

use mailrelay_transfer::{Strategy, TransferError, TransferLimits};

/// Where a URL attachment is in its length discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlPhase {
    /// Nothing attempted yet.
    Unknown,
    /// Length still being discovered (probe sent, or probe was inconclusive).
    Probing,
    /// Length known and within the inline threshold.
    KnownSmall(u64),
    /// Length known and above the threshold; stream into an upload session.
    KnownLarge(u64),
    /// No length header anywhere; buffer the whole body and classify after.
    UnknownBuffering,
    /// Transfer finished or failed.
    Terminal,
}

impl UrlPhase {
    /// Starts discovery.
    pub fn begin(self) -> Self {
        match self {
            Self::Unknown => Self::Probing,
            other => other,
        }
    }

    /// Applies the probe result. An inconclusive probe stays in `Probing`.
    pub fn after_probe(
        self,
        length: Option<u64>,
        limits: &TransferLimits,
    ) -> Result<Self, TransferError> {
        match (self, length) {
            (Self::Probing, Some(len)) => Self::known(len, limits),
            (state, _) => Ok(state),
        }
    }

    /// Applies the download response's length header.
    ///
    /// The response header describes the bytes actually streamed, so it
    /// replaces a probed length. Without one, a probed length is kept.
    pub fn after_response(
        self,
        length: Option<u64>,
        limits: &TransferLimits,
    ) -> Result<Self, TransferError> {
        match (self, length) {
            (Self::Probing | Self::KnownSmall(_) | Self::KnownLarge(_), Some(len)) => {
                Self::known(len, limits)
            }
            (Self::Probing, None) => Ok(Self::UnknownBuffering),
            (state, _) => Ok(state),
        }
    }

    /// Ends the machine.
    pub fn finish(self) -> Self {
        Self::Terminal
    }

    /// Declared length, if one has been learned.
    pub fn known_length(&self) -> Option<u64> {
        match self {
            Self::KnownSmall(len) | Self::KnownLarge(len) => Some(*len),
            _ => None,
        }
    }

    fn known(len: u64, limits: &TransferLimits) -> Result<Self, TransferError> {
        match limits.classify(Some(len))? {
            Strategy::Inline => Ok(Self::KnownSmall(len)),
            Strategy::Chunked => Ok(Self::KnownLarge(len)),
            Strategy::Pending => Ok(Self::Probing),
        }
    }
}
