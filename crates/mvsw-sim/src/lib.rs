//! Register-level model of an 88E6171 management interface.
//!
//! [`SimSwitch`] stands in for the physical chip in tests: it implements
//! the raw [`SmiBus`] transport, decodes the indirect command/data funnel
//! when wired that way, and models the handful of registers whose behavior
//! the driver depends on (VTU operation busy bit, global reset self-clear,
//! identity register). Everything else is plain 16-bit storage.
//!
//! The model also records every raw bus write, so tests can assert exact
//! register-write sequences.

use mvsw6171::regs;
use mvsw_smi::{SmiBus, SmiMode, SMI_CMD_BUSY, SMI_CMD_REG, SMI_DATA_REG};

/// Default port status: link up, full duplex, 1000 Mbps.
pub const STATUS_UP_1000_FDX: u16 = regs::PORT_STATUS_LINK
    | regs::PORT_STATUS_FDX
    | (regs::PORT_STATUS_SPEED_1000 << regs::PORT_STATUS_SPEED_SHIFT);

/// One loaded VLAN table entry, in load order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VtuEntry {
    pub vid: u16,
    /// Tag modes for ports 0-3, 4 bits each.
    pub data1: u16,
    /// Tag modes for ports 4-6, 4 bits each.
    pub data2: u16,
}

pub struct SimSwitch {
    wiring: SmiMode,
    ports: [[u16; 32]; regs::PORTS],
    global: [u16; 32],
    global2: [u16; 32],

    // Indirect funnel state.
    smi_cmd: u16,
    smi_data: u16,
    smi_busy_left: u32,
    smi_busy_reads: u32,

    // VTU operation busy-bit model.
    vtu_busy_left: u32,
    vtu_busy_reads: u32,
    vtu_stuck: bool,
    vtu: Vec<VtuEntry>,

    // Global reset self-clear model.
    reset_busy_left: u32,
    reset_busy_reads: u32,
    reset_stuck: bool,

    writes: Vec<(u8, u8, u16)>,
}

impl SimSwitch {
    /// A chip strapped for the given wiring, links up at 1000/full.
    pub fn new(wiring: SmiMode) -> Self {
        let mut ports = [[0u16; 32]; regs::PORTS];
        for bank in ports.iter_mut() {
            bank[regs::PORT_STATUS as usize] = STATUS_UP_1000_FDX;
        }

        Self {
            wiring,
            ports,
            global: [0; 32],
            global2: [0; 32],
            smi_cmd: 0,
            smi_data: 0,
            smi_busy_left: 0,
            smi_busy_reads: 0,
            vtu_busy_left: 0,
            vtu_busy_reads: 1,
            vtu_stuck: false,
            vtu: Vec::new(),
            reset_busy_left: 0,
            reset_busy_reads: 2,
            reset_stuck: false,
            writes: Vec::new(),
        }
    }

    pub fn wiring(&self) -> SmiMode {
        self.wiring
    }

    /// Loaded VLAN table, in load order. Flushed by the flush-all op.
    pub fn vtu_entries(&self) -> &[VtuEntry] {
        &self.vtu
    }

    /// Raw `(addr, reg, value)` log of every bus write seen.
    pub fn writes(&self) -> &[(u8, u8, u16)] {
        &self.writes
    }

    pub fn clear_writes(&mut self) {
        self.writes.clear();
    }

    /// Direct view of a port register, regardless of wiring.
    pub fn port_reg(&self, port: usize, reg: u8) -> u16 {
        self.ports[port][reg as usize]
    }

    pub fn global_reg(&self, reg: u8) -> u16 {
        self.global[reg as usize]
    }

    pub fn global2_reg(&self, reg: u8) -> u16 {
        self.global2[reg as usize]
    }

    pub fn set_port_status(&mut self, port: usize, raw: u16) {
        self.ports[port][regs::PORT_STATUS as usize] = raw;
    }

    /// Number of busy reads before a started VTU op reports idle.
    pub fn set_vtu_busy_reads(&mut self, reads: u32) {
        self.vtu_busy_reads = reads;
    }

    /// Wedge the VTU: the in-progress bit never clears.
    pub fn set_vtu_stuck(&mut self, stuck: bool) {
        self.vtu_stuck = stuck;
    }

    /// Number of busy reads before the reset bit self-clears.
    pub fn set_reset_busy_reads(&mut self, reads: u32) {
        self.reset_busy_reads = reads;
    }

    /// Wedge the reset bit: it never clears.
    pub fn set_reset_stuck(&mut self, stuck: bool) {
        self.reset_stuck = stuck;
    }

    /// Busy reads reported by the indirect funnel after each command.
    pub fn set_smi_busy_reads(&mut self, reads: u32) {
        self.smi_busy_reads = reads;
    }

    fn is_port_bank(addr: u8) -> bool {
        (regs::PORT_BASE..regs::PORT_BASE + regs::PORTS as u8).contains(&addr)
    }

    fn bank_read(&mut self, addr: u8, reg: u8) -> u16 {
        let idx = (reg & 0x1f) as usize;

        if Self::is_port_bank(addr) {
            if reg == regs::PORT_IDENT {
                return regs::IDENT_VALUE;
            }
            return self.ports[(addr - regs::PORT_BASE) as usize][idx];
        }

        if addr == regs::GLOBAL {
            if reg == regs::GLOBAL_VTU_OP {
                return self.vtu_op_read();
            }
            if reg == regs::GLOBAL_CONTROL {
                return self.global_control_read();
            }
            return self.global[idx];
        }

        if addr == regs::GLOBAL2 {
            return self.global2[idx];
        }

        0xffff
    }

    fn bank_write(&mut self, addr: u8, reg: u8, value: u16) {
        let idx = (reg & 0x1f) as usize;

        if Self::is_port_bank(addr) {
            self.ports[(addr - regs::PORT_BASE) as usize][idx] = value;
            return;
        }

        if addr == regs::GLOBAL {
            if reg == regs::GLOBAL_VTU_OP {
                self.vtu_op_write(value);
                return;
            }
            if reg == regs::GLOBAL_CONTROL {
                self.global_control_write(value);
                return;
            }
            self.global[idx] = value;
            return;
        }

        if addr == regs::GLOBAL2 {
            self.global2[idx] = value;
        }
    }

    fn vtu_op_read(&mut self) -> u16 {
        let value = self.global[regs::GLOBAL_VTU_OP as usize];
        if self.vtu_stuck {
            return value | regs::VTU_OP_INPROGRESS;
        }
        if self.vtu_busy_left > 0 {
            self.vtu_busy_left -= 1;
            return value | regs::VTU_OP_INPROGRESS;
        }
        value & !regs::VTU_OP_INPROGRESS
    }

    fn vtu_op_write(&mut self, value: u16) {
        self.global[regs::GLOBAL_VTU_OP as usize] = value & !regs::VTU_OP_INPROGRESS;
        if value & regs::VTU_OP_INPROGRESS == 0 {
            return;
        }

        self.vtu_busy_left = self.vtu_busy_reads;
        match value & (7 << 12) {
            regs::VTU_OP_FLUSH_ALL => self.vtu.clear(),
            regs::VTU_OP_LOAD => {
                let vid = self.global[regs::GLOBAL_VTU_VID as usize] & regs::PVID_MASK;
                self.vtu.push(VtuEntry {
                    vid,
                    data1: self.global[regs::GLOBAL_VTU_DATA1 as usize],
                    data2: self.global[regs::GLOBAL_VTU_DATA2 as usize],
                });
            }
            _ => {}
        }
    }

    fn global_control_read(&mut self) -> u16 {
        let value = self.global[regs::GLOBAL_CONTROL as usize];
        if self.reset_stuck {
            return value | regs::GLOBAL_CONTROL_RESET;
        }
        if self.reset_busy_left > 0 {
            self.reset_busy_left -= 1;
            return value | regs::GLOBAL_CONTROL_RESET;
        }
        value & !regs::GLOBAL_CONTROL_RESET
    }

    fn global_control_write(&mut self, value: u16) {
        self.global[regs::GLOBAL_CONTROL as usize] = value & !regs::GLOBAL_CONTROL_RESET;
        if value & regs::GLOBAL_CONTROL_RESET == 0 {
            return;
        }

        self.reset_busy_left = self.reset_busy_reads;
        if self.reset_stuck {
            return;
        }

        // The chip comes back with default registers and an empty VTU; the
        // status registers still reflect the wired links.
        for bank in self.ports.iter_mut() {
            let status = bank[regs::PORT_STATUS as usize];
            *bank = [0; 32];
            bank[regs::PORT_STATUS as usize] = status;
        }
        self.global2 = [0; 32];
        self.vtu.clear();
    }
}

impl SmiBus for SimSwitch {
    fn read(&mut self, addr: u8, reg: u8) -> u16 {
        match self.wiring {
            SmiMode::Direct => self.bank_read(addr, reg),
            SmiMode::Indirect => {
                if addr != regs::BASE {
                    return 0xffff;
                }
                match reg {
                    SMI_CMD_REG => {
                        if self.smi_busy_left > 0 {
                            self.smi_busy_left -= 1;
                            return self.smi_cmd | SMI_CMD_BUSY;
                        }
                        self.smi_cmd & !SMI_CMD_BUSY
                    }
                    SMI_DATA_REG => self.smi_data,
                    _ => 0xffff,
                }
            }
        }
    }

    fn write(&mut self, addr: u8, reg: u8, value: u16) {
        self.writes.push((addr, reg, value));

        match self.wiring {
            SmiMode::Direct => self.bank_write(addr, reg, value),
            SmiMode::Indirect => {
                if addr != regs::BASE {
                    return;
                }
                match reg {
                    SMI_DATA_REG => self.smi_data = value,
                    SMI_CMD_REG if value & SMI_CMD_BUSY != 0 => {
                        self.smi_cmd = value;
                        self.smi_busy_left = self.smi_busy_reads;
                        let target = ((value >> 5) & 0x1f) as u8;
                        let target_reg = (value & 0x1f) as u8;
                        match value & 0x0c00 {
                            // Opcode 01: write the latched data word.
                            0x0400 => {
                                let data = self.smi_data;
                                self.bank_write(target, target_reg, data);
                            }
                            // Opcode 10: latch the addressed register.
                            0x0800 => self.smi_data = self.bank_read(target, target_reg),
                            _ => {}
                        }
                    }
                    _ => {}
                }
            }
        }
    }
}
