//! BOLT 8 act sequencing on top of the `Noise_XK` state machine.
//!
//! Each side performs exactly two steps. The initiator writes Act One,
//! then turns Act Two into Act Three. The responder turns Act One into
//! Act Two, then consumes Act Three. A third step on either side fails
//! with `NO_MORE_STEPS`.

use secp256k1::{PublicKey, SecretKey};

use super::error::NoiseError;
use super::handshake::HandshakeState;
use super::transport::Transport;

/// Act One: version byte, ephemeral key, payload tag.
pub const ACT_ONE_SIZE: usize = 50;

/// Act Two: same shape as Act One.
pub const ACT_TWO_SIZE: usize = 50;

/// Act Three: version byte, encrypted static key, payload tag.
pub const ACT_THREE_SIZE: usize = 66;

/// Drives the three BOLT 8 acts for one side of a connection attempt.
///
/// Act sizes are fixed by the protocol; the `[u8; N]` parameters and
/// returns make a wrong-length act unrepresentable rather than a runtime
/// check.
pub struct NoiseHandshake {
    state: HandshakeState,
    steps_remaining: u8,
}

impl NoiseHandshake {
    /// Creates the initiator side. `remote_static` is the node ID being
    /// dialed. A fresh ephemeral key pair is generated when Act One is
    /// produced.
    #[must_use]
    pub fn new_initiator(local_static: SecretKey, remote_static: PublicKey) -> Self {
        Self {
            state: HandshakeState::new_initiator(local_static, remote_static),
            steps_remaining: 2,
        }
    }

    /// Creates the responder side.
    #[must_use]
    pub fn new_responder(local_static: SecretKey) -> Self {
        Self {
            state: HandshakeState::new_responder(local_static),
            steps_remaining: 2,
        }
    }

    /// Whether both steps for this side have run.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.steps_remaining == 0
    }

    /// The peer's static public key. For the responder this is available
    /// only after Act Three.
    #[must_use]
    pub fn remote_static(&self) -> Option<PublicKey> {
        self.state.remote_static()
    }

    /// Initiator step one: produce Act One.
    ///
    /// # Errors
    ///
    /// `NO_MORE_STEPS` after both steps ran, `OUT_OF_TURN` on the wrong
    /// role or out of order.
    pub fn get_act_one(&mut self) -> Result<[u8; ACT_ONE_SIZE], NoiseError> {
        self.ensure_step(2)?;

        let mut act_one = [0u8; ACT_ONE_SIZE];
        let written = self.state.write_message(&[], &mut act_one)?;
        debug_assert_eq!(written, ACT_ONE_SIZE);

        self.steps_remaining = 1;
        Ok(act_one)
    }

    /// Initiator step two: consume Act Two, produce Act Three. The secure
    /// channel is available via [`Self::into_transport`] afterwards.
    ///
    /// # Errors
    ///
    /// Act Two validation errors (`ACT2_*`), plus the step errors of
    /// [`Self::get_act_one`].
    pub fn process_act_two(
        &mut self,
        act_two: &[u8; ACT_TWO_SIZE],
    ) -> Result<[u8; ACT_THREE_SIZE], NoiseError> {
        self.ensure_step(1)?;

        let mut payload = [0u8; 0];
        self.state.read_message(act_two, &mut payload)?;

        let mut act_three = [0u8; ACT_THREE_SIZE];
        let written = self.state.write_message(&[], &mut act_three)?;
        debug_assert_eq!(written, ACT_THREE_SIZE);

        self.steps_remaining = 0;
        Ok(act_three)
    }

    /// Responder step one: consume Act One, produce Act Two.
    ///
    /// # Errors
    ///
    /// Act One validation errors (`ACT1_*`), plus step errors.
    pub fn process_act_one(
        &mut self,
        act_one: &[u8; ACT_ONE_SIZE],
    ) -> Result<[u8; ACT_TWO_SIZE], NoiseError> {
        self.ensure_step(2)?;

        let mut payload = [0u8; 0];
        self.state.read_message(act_one, &mut payload)?;

        let mut act_two = [0u8; ACT_TWO_SIZE];
        let written = self.state.write_message(&[], &mut act_two)?;
        debug_assert_eq!(written, ACT_TWO_SIZE);

        self.steps_remaining = 1;
        Ok(act_two)
    }

    /// Responder step two: consume Act Three, learning the initiator's
    /// static public key. The secure channel is available via
    /// [`Self::into_transport`] afterwards.
    ///
    /// # Errors
    ///
    /// Act Three validation errors (`ACT3_*`), plus step errors.
    pub fn process_act_three(
        &mut self,
        act_three: &[u8; ACT_THREE_SIZE],
    ) -> Result<PublicKey, NoiseError> {
        self.ensure_step(1)?;

        let mut payload = [0u8; 0];
        self.state.read_message(act_three, &mut payload)?;

        self.steps_remaining = 0;
        let remote_static = self
            .state
            .remote_static()
            .expect("act three carries the initiator's static key");
        Ok(remote_static)
    }

    /// Splits the completed handshake into the secure channel and the
    /// final handshake hash, destroying all handshake secrets.
    ///
    /// # Errors
    ///
    /// `HANDSHAKE_INCOMPLETE` while either step is outstanding.
    pub fn into_transport(self) -> Result<(Transport, [u8; 32]), NoiseError> {
        self.state.into_transport()
    }

    fn ensure_step(&self, expected_remaining: u8) -> Result<(), NoiseError> {
        if self.steps_remaining == 0 {
            return Err(NoiseError::NoMoreSteps);
        }
        if self.steps_remaining != expected_remaining {
            return Err(NoiseError::OutOfTurn);
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn set_ephemeral(&mut self, secret: SecretKey) {
        self.state.set_ephemeral(secret);
    }
}
