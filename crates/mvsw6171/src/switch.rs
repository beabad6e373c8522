//! Device handle: probe, attach, and the apply/reset pipeline.

use mvsw_smi::{self as smi, SmiBus, SmiError, SmiLink, SmiMode};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::reconcile::reconcile;
use crate::regs;
use crate::state::{SwitchState, VlanEntry};

/// One 88E6171 instance: the raw bus it lives on, the addressing scheme
/// detected at probe time, and the configuration model.
pub struct Switch<B> {
    bus: B,
    link: SmiLink,
    pub(crate) state: SwitchState,
}

impl<B: SmiBus> Switch<B> {
    /// Looks for an 88E6171 at the family's base address: identity read in
    /// direct mode first, retried in indirect mode. The scheme that answers
    /// is locked in for the life of the handle; `None` means no chip.
    pub fn probe(mut bus: B) -> Option<Self> {
        // Diagnostic dump of the base address, always in direct mode. Reads
        // garbage when the chip is actually wired indirectly.
        for reg in 0..32u8 {
            let value = bus.read(regs::BASE, reg);
            debug!(
                reg = format_args!("{reg:#04x}"),
                value = format_args!("{value:#06x}"),
                "probe register dump"
            );
        }

        for mode in [SmiMode::Direct, SmiMode::Indirect] {
            let link = SmiLink::new(mode, regs::BASE);
            let ident = link.read16(&mut bus, regs::port_addr(0), regs::PORT_IDENT);
            if ident.is_ok_and(|v| v & regs::IDENT_MASK == regs::IDENT_VALUE) {
                info!(?mode, "88E6171 found");
                return Some(Self::new(bus, mode));
            }
        }

        None
    }

    /// Builds a handle with a known addressing scheme, skipping the probe.
    pub fn new(bus: B, mode: SmiMode) -> Self {
        Self {
            bus,
            link: SmiLink::new(mode, regs::BASE),
            state: SwitchState::default(),
        }
    }

    /// First-time registration with the host network object. `apply` and
    /// `reset` refuse to touch the hardware until this has run.
    pub fn attach(&mut self) {
        self.state.registered = true;
    }

    pub fn detach(&mut self) {
        self.state.registered = false;
    }

    pub fn mode(&self) -> SmiMode {
        self.link.mode()
    }

    pub fn state(&self) -> &SwitchState {
        &self.state
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    pub(crate) fn read(&mut self, addr: u8, reg: u8) -> smi::Result<u16> {
        self.link.read16(&mut self.bus, addr, reg)
    }

    pub(crate) fn write(&mut self, addr: u8, reg: u8, value: u16) -> smi::Result<()> {
        self.link.write16(&mut self.bus, addr, reg, value)
    }

    fn rmw(&mut self, addr: u8, reg: u8, mask: u16, bits: u16) -> smi::Result<()> {
        let value = self.read(addr, reg)? & !mask;
        self.write(addr, reg, value | bits)
    }

    /// Mode-aware poll: each iteration is a full `read`, so in indirect
    /// wiring one poll is itself several bus transactions.
    fn wait_mask(&mut self, addr: u8, reg: u8, mask: u16, value: u16) -> smi::Result<()> {
        for _ in 0..smi::POLL_ITERATIONS {
            if self.read(addr, reg)? & mask == value {
                return Ok(());
            }
        }
        Err(SmiError::Timeout)
    }

    fn vtu_wait_idle(&mut self) -> smi::Result<()> {
        self.wait_mask(regs::GLOBAL, regs::GLOBAL_VTU_OP, regs::VTU_OP_INPROGRESS, 0)
    }

    fn vtu_flush(&mut self) -> smi::Result<()> {
        self.vtu_wait_idle()?;
        self.write(
            regs::GLOBAL,
            regs::GLOBAL_VTU_OP,
            regs::VTU_OP_INPROGRESS | regs::VTU_OP_FLUSH_ALL,
        )
    }

    fn vtu_load(&mut self, vlan: &VlanEntry) -> smi::Result<()> {
        self.vtu_wait_idle()?;
        self.write(
            regs::GLOBAL,
            regs::GLOBAL_VTU_VID,
            regs::VTU_VID_VALID | vlan.vid,
        )?;
        let (lo, hi) = vlan.port_mode.halves();
        self.write(regs::GLOBAL, regs::GLOBAL_VTU_DATA1, lo)?;
        self.write(regs::GLOBAL, regs::GLOBAL_VTU_DATA2, hi)?;
        self.write(
            regs::GLOBAL,
            regs::GLOBAL_VTU_OP,
            regs::VTU_OP_INPROGRESS | regs::VTU_OP_LOAD,
        )?;
        self.vtu_wait_idle()
    }

    /// Rewrites the VLAN table from the 802.1Q-eligible slots in ascending
    /// order. The VTU is a single shared resource with no queueing, so each
    /// slot is a strict wait/write/wait sequence; a step that times out
    /// skips only the slot it belongs to.
    fn vtu_program(&mut self) {
        if let Err(err) = self.vtu_flush() {
            warn!(%err, "VTU flush skipped");
        }

        for vno in 1..regs::VLANS {
            let vlan = self.state.vlans[vno];
            if vlan.mask == 0 || vlan.vid == 0 || vlan.port_based {
                continue;
            }
            if let Err(err) = self.vtu_load(&vlan) {
                warn!(%err, slot = vno, "VTU load skipped");
            }
        }
    }

    fn program_port(&mut self, pno: usize) -> smi::Result<()> {
        let addr = regs::port_addr(pno);
        let port = self.state.ports[pno];
        self.rmw(addr, regs::PORT_VLANID, regs::PVID_MASK, port.pvid)?;
        self.rmw(addr, regs::PORT_VLANMAP, regs::PORT_MASK_ALL, port.mask)?;
        self.rmw(addr, regs::PORT_CONTROL2, regs::QMODE_MASK, port.qmode.bits())
    }

    /// Programs the hardware from the current model: VLAN table, then the
    /// global forwarding mode, then every port's derived fields.
    ///
    /// Only VLAN definitions known to this driver survive; whatever port
    /// mapping the hardware held before is overwritten. Polling timeouts
    /// inside this path are logged and skipped rather than propagated; only
    /// `reset` treats a timeout as fatal.
    pub fn apply(&mut self) -> Result<()> {
        if !self.state.registered {
            return Err(Error::NotReady);
        }

        self.vtu_program();

        // With 802.1Q-only forwarding set, tagged traffic no longer depends
        // on the port-based VLAN map; port-based VLANs keep working as long
        // as their vid stays out of the VTU.
        let vlan_only = if self.state.vlan_enabled {
            regs::G2_8021Q_VLAN_ONLY
        } else {
            0
        };
        if let Err(err) = self.rmw(
            regs::GLOBAL2,
            regs::GLOBAL2_SDET_POLARITY,
            regs::G2_8021Q_VLAN_ONLY,
            vlan_only,
        ) {
            warn!(%err, "802.1Q-only mode write skipped");
        }

        reconcile(&mut self.state);

        for pno in 0..regs::PORTS {
            if let Err(err) = self.program_port(pno) {
                warn!(%err, port = pno, "port programming incomplete");
            }
        }

        Ok(())
    }

    /// Full reinitialization: take every port down, pulse the hardware
    /// reset, clear the software model, re-apply it, then bring the ports
    /// back up. A timeout anywhere here is fatal and leaves the ports
    /// disabled.
    pub fn reset(&mut self) -> Result<()> {
        if !self.state.registered {
            return Err(Error::NotReady);
        }

        for pno in 0..regs::PORTS {
            self.rmw(
                regs::port_addr(pno),
                regs::PORT_CONTROL,
                regs::PORT_CONTROL_FORWARDING,
                0,
            )?;
        }

        let reg = self.read(regs::GLOBAL, regs::GLOBAL_CONTROL)?;
        self.write(
            regs::GLOBAL,
            regs::GLOBAL_CONTROL,
            reg | regs::GLOBAL_CONTROL_RESET,
        )?;
        self.wait_mask(
            regs::GLOBAL,
            regs::GLOBAL_CONTROL,
            regs::GLOBAL_CONTROL_RESET,
            0,
        )?;

        self.state.clear_config();

        for pno in 0..regs::PORTS {
            let addr = regs::port_addr(pno);
            self.rmw(addr, regs::PORT_FORCE, regs::FORCE_FC_MASK, regs::FORCE_FC_DISABLE)?;
            // Source addresses seen on a port associate with that port alone.
            self.write(addr, regs::PORT_ASSOC, 1 << pno)?;
        }

        self.apply()?;

        for pno in 0..regs::PORTS {
            self.rmw(
                regs::port_addr(pno),
                regs::PORT_CONTROL,
                regs::PORT_CONTROL_FORWARDING,
                regs::PORT_CONTROL_FORWARDING,
            )?;
        }

        Ok(())
    }
}
