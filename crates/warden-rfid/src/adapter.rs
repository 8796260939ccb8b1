//! Per-controller reader input adapter.

use crate::{
    decoder::CardDecoder,
    wiegand::{self, ReaderInput},
};
use tracing::{debug, info};
use warden_core::{
    ControllerConfig, CredentialEvent, CredentialId, DiagnosticVerbosity, Result,
    diagnostics::render_credential,
};

/// Classifies reader bursts, decodes card frames and writes the diagnostic
/// credential log at the configured verbosity.
#[derive(Debug, Clone)]
pub struct ReaderInputAdapter {
    decoder: CardDecoder,
    verbosity: DiagnosticVerbosity,
}

impl ReaderInputAdapter {
    pub fn new(decoder: CardDecoder, verbosity: DiagnosticVerbosity) -> Self {
        Self { decoder, verbosity }
    }

    pub fn from_config(config: &ControllerConfig) -> Self {
        Self::new(
            CardDecoder::new(config.card_format, config.frame_bits),
            config.verbosity,
        )
    }

    /// Classify a burst from a reader port.
    ///
    /// # Errors
    ///
    /// Returns `Error::MalformedCredential` for bursts that are neither a
    /// valid key nor made of bits.
    pub fn classify(&self, bits: &[u8]) -> Result<ReaderInput> {
        wiegand::classify(bits, self.decoder.frame_bits())
    }

    /// Decode the frame carried by a credential event.
    ///
    /// # Errors
    ///
    /// Returns `Error::MalformedCredential` on a length or parity mismatch.
    pub fn decode(&self, event: &CredentialEvent) -> Result<CredentialId> {
        let id = self.decoder.decode(&event.raw);
        if let Err(e) = &id {
            debug!(reader = %event.reader, error = %e, "Frame rejected");
        }
        id
    }

    /// Record a scan in the diagnostic log once its outcome is known.
    pub fn log_scan(&self, event: &CredentialEvent, id: Option<CredentialId>, denied: bool) {
        if let Some(line) = render_credential(self.verbosity, event, id, denied) {
            info!(tick = %event.timestamp, "{line}");
        }
    }

    pub fn verbosity(&self) -> DiagnosticVerbosity {
        self.verbosity
    }
}
