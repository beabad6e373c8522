//! SMI (MDIO) register access for Marvell-style managed switch chips.
//!
//! The switch's port and global register banks are reached over the MDIO
//! management bus in one of two wiring schemes:
//!
//! - **Direct addressing**: every register bank appears at its own device
//!   address, so an access is a single bus transaction.
//! - **Indirect addressing**: the whole chip answers at a single device
//!   address and exposes a command/data register pair. Each access is a
//!   sequence of busy polls and funnel transactions against that pair.
//!
//! Which scheme is in effect depends on how the chip is strapped on the
//! board; it is detected once at probe time and never changes afterwards.
//! [`SmiLink`] captures the detected scheme and performs mode-aware 16-bit
//! accesses on top of a raw [`SmiBus`].

use thiserror::Error;
use tracing::debug;

/// Busy-wait budget: one raw bus read per iteration, no delay in between.
pub const POLL_ITERATIONS: u32 = 100;

/// Indirect-mode command register (at the chip's base address).
pub const SMI_CMD_REG: u8 = 0;
/// Indirect-mode data register (at the chip's base address).
pub const SMI_DATA_REG: u8 = 1;
/// Command-register busy flag; set while a funnel transaction is in flight.
pub const SMI_CMD_BUSY: u16 = 1 << 15;

/// Read command word: busy/start, clause-22 frame, opcode "read".
const SMI_CMD_READ: u16 = 0x9800;
/// Write command word: busy/start, clause-22 frame, opcode "write".
const SMI_CMD_WRITE: u16 = 0x9400;

pub type Result<T> = std::result::Result<T, SmiError>;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SmiError {
    #[error("register poll exceeded {POLL_ITERATIONS} iterations")]
    Timeout,
}

/// Raw synchronous MDIO transport supplied by the host.
///
/// The transport is not reliable: a read may return stale or floating data
/// while the chip is busy, which is why everything above it polls.
pub trait SmiBus {
    fn read(&mut self, addr: u8, reg: u8) -> u16;
    fn write(&mut self, addr: u8, reg: u8, value: u16);
}

impl<B: SmiBus + ?Sized> SmiBus for &mut B {
    fn read(&mut self, addr: u8, reg: u8) -> u16 {
        (**self).read(addr, reg)
    }

    fn write(&mut self, addr: u8, reg: u8, value: u16) {
        (**self).write(addr, reg, value);
    }
}

/// Polls `(addr, reg)` until `value & mask == value` or the iteration budget
/// runs out.
pub fn wait_mask<B: SmiBus + ?Sized>(
    bus: &mut B,
    addr: u8,
    reg: u8,
    mask: u16,
    value: u16,
) -> Result<()> {
    for _ in 0..POLL_ITERATIONS {
        if bus.read(addr, reg) & mask == value {
            return Ok(());
        }
    }
    Err(SmiError::Timeout)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmiMode {
    Direct,
    Indirect,
}

/// Mode-aware register access path to one switch chip.
///
/// `base` is the device address the chip answers at when wired indirectly;
/// it is where the command/data funnel lives. Immutable once constructed.
#[derive(Debug, Clone, Copy)]
pub struct SmiLink {
    mode: SmiMode,
    base: u8,
}

impl SmiLink {
    pub fn new(mode: SmiMode, base: u8) -> Self {
        Self { mode, base }
    }

    pub fn mode(&self) -> SmiMode {
        self.mode
    }

    pub fn base(&self) -> u8 {
        self.base
    }

    fn command_word(op: u16, addr: u8, reg: u8) -> u16 {
        op | (u16::from(addr) << 5) | u16::from(reg)
    }

    fn wait_ready<B: SmiBus>(&self, bus: &mut B) -> Result<()> {
        wait_mask(bus, self.base, SMI_CMD_REG, SMI_CMD_BUSY, 0)
    }

    /// 16-bit register read at `(addr, reg)` through the detected scheme.
    pub fn read16<B: SmiBus>(&self, bus: &mut B, addr: u8, reg: u8) -> Result<u16> {
        if self.mode == SmiMode::Direct {
            return Ok(bus.read(addr, reg));
        }

        self.wait_ready(bus)?;
        let cmd = Self::command_word(SMI_CMD_READ, addr, reg);
        bus.write(self.base, SMI_CMD_REG, cmd);
        self.wait_ready(bus)?;
        let value = bus.read(self.base, SMI_DATA_REG);
        debug!(cmd = format_args!("{cmd:#06x}"), value = format_args!("{value:#06x}"), "indirect read");
        Ok(value)
    }

    /// 16-bit register write to `(addr, reg)` through the detected scheme.
    pub fn write16<B: SmiBus>(&self, bus: &mut B, addr: u8, reg: u8, value: u16) -> Result<()> {
        if self.mode == SmiMode::Direct {
            bus.write(addr, reg, value);
            return Ok(());
        }

        self.wait_ready(bus)?;
        bus.write(self.base, SMI_DATA_REG, value);
        self.wait_ready(bus)?;
        let cmd = Self::command_word(SMI_CMD_WRITE, addr, reg);
        bus.write(self.base, SMI_CMD_REG, cmd);
        debug!(cmd = format_args!("{cmd:#06x}"), value = format_args!("{value:#06x}"), "indirect write");
        Ok(())
    }
}
