//! AES accelerator capability: key material, transaction parameters and the
//! engine interface the streaming pipeline drives.

use {
    crate::{
        error::{Error, Precondition},
        timer::{Clock, Deadline},
    },
    bitflags::bitflags,
    core::ops::{Deref, DerefMut},
    zeroize::{Zeroize, ZeroizeOnDrop},
};

pub const BLOCK_SIZE: usize = 16;
pub const KEY_SIZE: usize = 16;
pub const IV_SIZE: usize = 16;

/// AES-128 key used by the demo.
pub const DEMO_KEY: Key = Key([
    0x60, 0x3d, 0xeb, 0x10, 0x15, 0xca, 0x71, 0xbe, 0x2b, 0x73, 0xae, 0xf0, 0x85, 0x7d, 0x77, 0x81,
]);

/// Fixed second share the demo key is masked with.
pub const DEMO_KEY_SHARE1: [u8; KEY_SIZE] = [
    0x0f, 0x1f, 0x2f, 0x3f, 0x4f, 0x5f, 0x6f, 0x7f, 0x8f, 0x9f, 0xaf, 0xbf, 0xcf, 0xdf, 0xef, 0xff,
];

/// IV words `[0xeb, 0x10, 0x15, 0xca]` as they land in the little-endian IV registers.
pub const DEMO_IV: Iv = Iv([
    0xeb, 0x00, 0x00, 0x00, 0x10, 0x00, 0x00, 0x00, 0x15, 0x00, 0x00, 0x00, 0xca, 0x00, 0x00, 0x00,
]);

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Key(pub [u8; KEY_SIZE]);

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Iv(pub [u8; IV_SIZE]);

/// One unit of data exchanged with the engine, in either direction.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct Block(pub [u8; BLOCK_SIZE]);

impl Key {
    pub fn try_from_slice(bytes: &[u8]) -> Option<Self> {
        bytes.try_into().ok().map(Key)
    }
}

impl Iv {
    pub fn try_from_slice(bytes: &[u8]) -> Option<Self> {
        bytes.try_into().ok().map(Iv)
    }
}

impl Block {
    pub fn try_from_slice(bytes: &[u8]) -> Option<Self> {
        bytes.try_into().ok().map(Block)
    }
}

/// The key split into two shares that XOR back to the real key, so the key is
/// never held in one register.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct KeyShare {
    pub share0: [u8; KEY_SIZE],
    pub share1: [u8; KEY_SIZE],
}

impl KeyShare {
    pub fn derive(real_key: &Key, share1: &[u8; KEY_SIZE]) -> Self {
        let mut share0 = [0u8; KEY_SIZE];
        for (i, byte) in share0.iter_mut().enumerate() {
            *byte = real_key.0[i] ^ share1[i];
        }

        Self {
            share0,
            share1: *share1,
        }
    }

    /// Reconstructs the real key.
    pub fn combine(&self) -> Key {
        let mut key = [0u8; KEY_SIZE];
        for (i, byte) in key.iter_mut().enumerate() {
            *byte = self.share0[i] ^ self.share1[i];
        }
        Key(key)
    }
}

impl core::fmt::Debug for KeyShare {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("KeyShare { .. }")
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Operation {
    Encrypt = 1,
    Decrypt = 2,
}

/// Block chaining mode, in the one-hot encoding of the control register.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Mode {
    Ecb = 1 << 0,
    Cbc = 1 << 1,
    Cfb = 1 << 2,
    Ofb = 1 << 3,
    Ctr = 1 << 4,
}

impl Mode {
    pub const ALL: [Mode; 5] = [Mode::Ecb, Mode::Cbc, Mode::Cfb, Mode::Ofb, Mode::Ctr];

    pub fn label(self) -> &'static str {
        match self {
            Mode::Ecb => "ECB",
            Mode::Cbc => "CBC",
            Mode::Cfb => "CFB",
            Mode::Ofb => "OFB",
            Mode::Ctr => "CTR",
        }
    }
}

impl TryFrom<u32> for Mode {
    type Error = u32;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            v if v == Mode::Ecb as u32 => Ok(Mode::Ecb),
            v if v == Mode::Cbc as u32 => Ok(Mode::Cbc),
            v if v == Mode::Cfb as u32 => Ok(Mode::Cfb),
            v if v == Mode::Ofb as u32 => Ok(Mode::Ofb),
            v if v == Mode::Ctr as u32 => Ok(Mode::Ctr),
            other => Err(other),
        }
    }
}

/// Label for a raw mode register value, `"Unknown"` for anything unsupported.
pub fn mode_label(raw: u32) -> &'static str {
    Mode::try_from(raw).map(Mode::label).unwrap_or("Unknown")
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum KeyLen {
    Aes128 = 1,
    Aes192 = 2,
    Aes256 = 4,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum KeyProvider {
    /// Key shares written by software.
    Software,
    /// Key derived by the key manager and sideloaded into the engine.
    Sideload,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MaskReseeding {
    PerBlock = 1 << 0,
    Per64Blocks = 1 << 1,
    Per8kBlocks = 1 << 2,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Trigger {
    /// Loading a full input block starts the computation.
    Auto,
    /// Software has to issue a start trigger after every load.
    Manual,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub operation: Operation,
    pub mode: Mode,
    pub key_len: KeyLen,
    pub key_provider: KeyProvider,
    pub mask_reseeding: MaskReseeding,
    pub trigger: Trigger,
    pub reseed_on_key_change: bool,
    pub ctrl_aux_lock: bool,
}

impl Transaction {
    /// Software-keyed AES-128 encryption with automatic triggering.
    pub fn encrypt(mode: Mode) -> Self {
        Self {
            operation: Operation::Encrypt,
            mode,
            key_len: KeyLen::Aes128,
            key_provider: KeyProvider::Software,
            mask_reseeding: MaskReseeding::Per64Blocks,
            trigger: Trigger::Auto,
            reseed_on_key_change: false,
            ctrl_aux_lock: false,
        }
    }

    pub fn decrypt(mode: Mode) -> Self {
        Self {
            operation: Operation::Decrypt,
            ..Self::encrypt(mode)
        }
    }
}

bitflags! {
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct AesStatus: u32 {
        /// No operation in progress
        const IDLE                        = 1 << 0;
        /// Output register holds data that has not been read yet, engine is waiting
        const STALL                       = 1 << 1;
        /// Output was overwritten before software read it
        const OUTPUT_LOST                 = 1 << 2;
        /// Output register holds a result (cleared by reading it)
        const OUTPUT_VALID                = 1 << 3;
        /// Input register can be written
        const INPUT_READY                 = 1 << 4;
        /// Control register update was rejected
        const ALERT_RECOV_CTRL_UPDATE_ERR = 1 << 5;
        /// Fatal fault, the engine has to be reset
        const ALERT_FATAL_FAULT           = 1 << 6;
    }
}

/// A block cipher accelerator with one input and one output register.
pub trait CipherEngine {
    /// Configures the engine and loads key shares and IV.
    fn start(&mut self, transaction: &Transaction, key: &KeyShare, iv: &Iv) -> Result<(), Error>;

    /// Writes one block into the input register.
    fn load_input(&mut self, block: &Block) -> Result<(), Error>;

    /// Starts processing the loaded block when the transaction uses [`Trigger::Manual`].
    fn trigger(&mut self) -> Result<(), Error>;

    fn status(&mut self) -> Result<AesStatus, Error>;

    /// Reads the output register, which clears `OUTPUT_VALID`.
    fn read_output(&mut self) -> Result<Block, Error>;

    /// Terminates the transaction and clears key material from the engine.
    fn end(&mut self) -> Result<(), Error>;

    /// Busy-waits until `flag` reads as `expected`.
    fn poll_status<C: Clock>(
        &mut self,
        clock: &C,
        flag: AesStatus,
        expected: bool,
        timeout_us: u32,
    ) -> Result<(), Error> {
        let deadline = Deadline::new(clock, timeout_us);

        loop {
            let status = self.status()?;

            if status.contains(AesStatus::ALERT_FATAL_FAULT) {
                return Err(Error::Engine);
            }

            if status.contains(flag) == expected {
                return Ok(());
            }

            if deadline.expired(clock) {
                log::warn!("timeout waiting for {:?}, status: {:?}", flag, status);
                return Err(Error::DeadlineExceeded(flag));
            }
        }
    }
}

/// An open engine transaction. Ends the transaction when dropped unless
/// [`EngineSession::finish`] already did.
pub struct EngineSession<'a, E: CipherEngine> {
    engine: &'a mut E,
    open: bool,
}

impl<'a, E: CipherEngine> EngineSession<'a, E> {
    pub fn start(
        engine: &'a mut E,
        transaction: &Transaction,
        key: &KeyShare,
        iv: &Iv,
    ) -> Result<Self, Error> {
        match engine.start(transaction, key, iv) {
            Ok(()) => Ok(Self { engine, open: true }),
            // Somebody else's transaction, leave it alone.
            Err(e @ Error::Precondition(Precondition::EngineBusy)) => Err(e),
            Err(e) => {
                // The engine may have latched part of the configuration.
                if let Err(end_err) = engine.end() {
                    log::warn!("failed to end rejected transaction: {}", end_err);
                }
                Err(e)
            }
        }
    }

    /// Ends the transaction, reporting whether the engine accepted it.
    pub fn finish(mut self) -> Result<(), Error> {
        self.open = false;
        self.engine.end()
    }
}

impl<E: CipherEngine> Deref for EngineSession<'_, E> {
    type Target = E;

    fn deref(&self) -> &E {
        self.engine
    }
}

impl<E: CipherEngine> DerefMut for EngineSession<'_, E> {
    fn deref_mut(&mut self) -> &mut E {
        self.engine
    }
}

impl<E: CipherEngine> Drop for EngineSession<'_, E> {
    fn drop(&mut self) {
        if self.open {
            if let Err(e) = self.engine.end() {
                log::warn!("failed to end aborted transaction: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shares_reconstruct_key() {
        let share = KeyShare::derive(&DEMO_KEY, &DEMO_KEY_SHARE1);
        assert_eq!(share.combine(), DEMO_KEY);
        assert_eq!(share.share1, DEMO_KEY_SHARE1);
        for i in 0..KEY_SIZE {
            assert_eq!(share.share0[i] ^ share.share1[i], DEMO_KEY.0[i]);
            assert_eq!(share.share0[i] ^ DEMO_KEY.0[i], share.share1[i]);
        }
        assert_ne!(share.share0, DEMO_KEY.0);
    }

    #[test]
    fn shares_hold_for_arbitrary_inputs() {
        let mut seed = 0x1234_5678u32;
        for _ in 0..64 {
            let mut key = [0u8; KEY_SIZE];
            let mut mask = [0u8; KEY_SIZE];
            for i in 0..KEY_SIZE {
                seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12345);
                key[i] = (seed >> 16) as u8;
                mask[i] = (seed >> 8) as u8;
            }
            let share = KeyShare::derive(&Key(key), &mask);
            assert_eq!(share.combine(), Key(key));
            assert_eq!(share.share1, mask);
        }
    }

    #[test]
    fn zero_share_leaves_key_in_share0() {
        let share = KeyShare::derive(&DEMO_KEY, &[0; KEY_SIZE]);
        assert_eq!(share.share0, DEMO_KEY.0);
    }

    #[test]
    fn key_share_debug_hides_material() {
        let share = KeyShare::derive(&DEMO_KEY, &DEMO_KEY_SHARE1);
        assert_eq!(format!("{:?}", share), "KeyShare { .. }");
    }

    #[test]
    fn mode_labels() {
        let expected = ["ECB", "CBC", "CFB", "OFB", "CTR"];
        for (mode, label) in Mode::ALL.iter().zip(expected) {
            assert_eq!(mode.label(), label);
            assert_eq!(mode_label(*mode as u32), label);
        }
    }

    #[test]
    fn unknown_mode_label() {
        for raw in [0, 3, 1 << 5, (1 << 6) - 1, u32::MAX] {
            assert_eq!(mode_label(raw), "Unknown");
        }
    }

    #[test]
    fn mode_round_trips_register_value() {
        assert_eq!(Mode::try_from(1 << 2), Ok(Mode::Cfb));
        assert_eq!(Mode::try_from(6), Err(6));
    }

    #[test]
    fn demo_transaction_defaults() {
        let t = Transaction::encrypt(Mode::Cbc);
        assert_eq!(t.operation, Operation::Encrypt);
        assert_eq!(t.key_len, KeyLen::Aes128);
        assert_eq!(t.key_provider, KeyProvider::Software);
        assert_eq!(t.mask_reseeding, MaskReseeding::Per64Blocks);
        assert_eq!(t.trigger, Trigger::Auto);
        assert!(!t.reseed_on_key_change);
        assert!(!t.ctrl_aux_lock);
        assert_eq!(Transaction::decrypt(Mode::Cbc).operation, Operation::Decrypt);
    }

    #[test]
    fn slices_of_wrong_length_are_rejected() {
        assert!(Key::try_from_slice(&[0; 15]).is_none());
        assert!(Iv::try_from_slice(&[0; 17]).is_none());
        assert_eq!(Block::try_from_slice(&[7; 16]), Some(Block([7; 16])));
    }
}
