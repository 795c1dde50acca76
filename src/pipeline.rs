//! Streams a plaintext image through the cipher engine into an open display
//! region, one block in flight.
//!
//! Loading the next plaintext block starts its computation, so the engine works
//! on block `n + 1` while block `n` is being pushed to the display.

use crate::{
    aes::{AesStatus, Block, CipherEngine, EngineSession, Iv, KeyShare, Transaction, Trigger},
    cursor::StreamCursor,
    display::StreamingSink,
    error::{Error, Precondition},
    timer::{Clock, Profile},
};

/// Status-poll budget in microseconds.
pub const DEFAULT_POLL_TIMEOUT_US: u32 = 5000;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub poll_timeout_us: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            poll_timeout_us: DEFAULT_POLL_TIMEOUT_US,
        }
    }
}

/// Encrypts (or decrypts) `image` block by block and forwards every output
/// block to `sink` in input order.
///
/// The sink region must already be open and is left open. Returns the cycles
/// spent between starting and ending the engine transaction. Nothing is
/// retried; on any error the transaction is ended and whatever reached the
/// sink stays there.
#[allow(clippy::too_many_arguments)]
pub fn run<E, S, C>(
    engine: &mut E,
    sink: &mut S,
    clock: &C,
    image: &[u8],
    transaction: &Transaction,
    key: &KeyShare,
    iv: &Iv,
    config: &PipelineConfig,
) -> Result<u64, Error>
where
    E: CipherEngine,
    S: StreamingSink,
    C: Clock,
{
    let mut cursor = StreamCursor::new(image)?;

    if !sink.is_open() {
        return Err(Precondition::RegionClosed.into());
    }

    log::debug!(
        "AES {} {:?}: {} blocks",
        transaction.mode.label(),
        transaction.operation,
        cursor.blocks()
    );

    let timeout = config.poll_timeout_us;
    let profile = Profile::start(clock);
    let mut session = EngineSession::start(engine, transaction, key, iv)?;

    load(&mut *session, transaction, &next_block(&cursor)?)?;

    loop {
        session.poll_status(clock, AesStatus::OUTPUT_VALID, true, timeout)?;
        let output = session.read_output()?;

        let more = cursor.advance();
        if more {
            session.poll_status(clock, AesStatus::INPUT_READY, true, timeout)?;
            load(&mut *session, transaction, &next_block(&cursor)?)?;
        }

        sink.write(&output.0)?;

        if !more {
            break;
        }
    }

    session.finish()?;
    let cycles = profile.stop(clock);

    log::debug!("AES {} done in {} cycles", transaction.mode.label(), cycles);

    Ok(cycles)
}

fn next_block(cursor: &StreamCursor) -> Result<Block, Error> {
    cursor.block().ok_or(Error::Engine)
}

fn load<E: CipherEngine>(
    engine: &mut E,
    transaction: &Transaction,
    block: &Block,
) -> Result<(), Error> {
    engine.load_input(block)?;

    if transaction.trigger == Trigger::Manual {
        engine.trigger()?;
    }

    Ok(())
}
