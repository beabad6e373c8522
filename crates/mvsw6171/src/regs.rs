//! 88E6171 register map.
//!
//! Port register banks sit at SMI addresses `0x10 + port`; the global and
//! global2 banks have their own addresses. All registers are 16 bits.

/// SMI device address the chip answers at (also port 0's register bank).
pub const BASE: u8 = 0x10;

/// Number of switch ports (5 PHY ports plus 2 RGMII).
pub const PORTS: usize = 7;
/// Number of VLAN table slots known to the driver. Slot 0 is reserved.
pub const VLANS: usize = 16;
/// Port wired to the host MAC.
pub const CPU_PORT: usize = 5;

/// All valid port bits.
pub const PORT_MASK_ALL: u16 = (1 << PORTS) - 1;

/// First port register bank.
pub const PORT_BASE: u8 = 0x10;
/// Global register bank.
pub const GLOBAL: u8 = 0x1b;
/// Global2 register bank.
pub const GLOBAL2: u8 = 0x1c;

pub const fn port_addr(port: usize) -> u8 {
    PORT_BASE + port as u8
}

// Per-port registers.
pub const PORT_STATUS: u8 = 0x00;
/// Physical control: force-speed/duplex/flow-control overrides.
pub const PORT_FORCE: u8 = 0x01;
/// Switch identifier; reads the product number.
pub const PORT_IDENT: u8 = 0x03;
pub const PORT_CONTROL: u8 = 0x04;
/// Port-based VLAN map (output port mask).
pub const PORT_VLANMAP: u8 = 0x06;
/// Default VLAN id (PVID) for untagged ingress.
pub const PORT_VLANID: u8 = 0x07;
/// Port control 2: 802.1Q mode among other things.
pub const PORT_CONTROL2: u8 = 0x08;
/// Port association vector (source-address learning mask).
pub const PORT_ASSOC: u8 = 0x0b;

// Port status bits.
pub const PORT_STATUS_LINK: u16 = 1 << 11;
pub const PORT_STATUS_FDX: u16 = 1 << 10;
pub const PORT_STATUS_SPEED_MASK: u16 = 3 << 8;
pub const PORT_STATUS_SPEED_SHIFT: u16 = 8;
pub const PORT_STATUS_SPEED_10: u16 = 0x00;
pub const PORT_STATUS_SPEED_100: u16 = 0x01;
pub const PORT_STATUS_SPEED_1000: u16 = 0x02;

/// Port state bits 1:0 of PORT_CONTROL; 0b11 = forwarding, 0b00 = disabled.
pub const PORT_CONTROL_FORWARDING: u16 = 0x0003;

/// Force flow-control field of PORT_FORCE.
pub const FORCE_FC_MASK: u16 = 0x00c0;
/// Flow control forced off.
pub const FORCE_FC_DISABLE: u16 = 0x0040;

/// PVID field of PORT_VLANID.
pub const PVID_MASK: u16 = 0x0fff;

/// 802.1Q mode field of PORT_CONTROL2.
pub const QMODE_MASK: u16 = 3 << 10;
pub const QMODE_SHIFT: u16 = 10;

// Global registers.
pub const GLOBAL_CONTROL: u8 = 0x04;
/// Software reset; self-clears when the chip comes back.
pub const GLOBAL_CONTROL_RESET: u16 = 1 << 15;

/// VLAN Translation Unit operation register.
pub const GLOBAL_VTU_OP: u8 = 0x05;
pub const GLOBAL_VTU_VID: u8 = 0x06;
/// Member tag modes for ports 0-3, 4 bits each.
pub const GLOBAL_VTU_DATA1: u8 = 0x07;
/// Member tag modes for ports 4-6, 4 bits each.
pub const GLOBAL_VTU_DATA2: u8 = 0x08;

/// Set while a VTU operation is in flight; writing it starts one.
pub const VTU_OP_INPROGRESS: u16 = 1 << 15;
pub const VTU_OP_FLUSH_ALL: u16 = 1 << 12;
pub const VTU_OP_LOAD: u16 = 3 << 12;
/// Valid bit of GLOBAL_VTU_VID.
pub const VTU_VID_VALID: u16 = 1 << 12;

// Global2 registers.
pub const GLOBAL2_SDET_POLARITY: u8 = 0x1d;
/// Forward on 802.1Q membership only, ignoring the port-based VLAN map.
pub const G2_8021Q_VLAN_ONLY: u16 = 1 << 15;

/// Product number of the 88E6171, as read from PORT_IDENT.
pub const IDENT_MASK: u16 = 0xfff0;
pub const IDENT_VALUE: u16 = 0x1710;
