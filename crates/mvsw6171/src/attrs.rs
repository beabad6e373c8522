//! Attribute surface consumed by the host's configuration layer.
//!
//! Setters validate their arguments and mutate [`crate::SwitchState`] only;
//! nothing takes effect on the wire until [`crate::Switch::apply`]. The
//! `mask`, `status` and `link` getters are the exception: they read live
//! hardware registers.

use mvsw_smi::SmiBus;

use crate::error::{Error, Result};
use crate::regs;
use crate::state::{QMode, TagMode, TagModes};
use crate::switch::Switch;

/// One VLAN membership entry: a port and its egress tagging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VlanPort {
    pub port: usize,
    pub tagged: bool,
}

/// Attribute scope, mirroring the host framework's three tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrDomain {
    Global,
    Vlan,
    Port,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrValue {
    Int(i32),
    Str(String),
}

fn check_vlan(vno: usize) -> Result<()> {
    if vno == 0 || vno >= regs::VLANS {
        return Err(Error::InvalidArgument);
    }
    Ok(())
}

fn check_port(pno: usize) -> Result<()> {
    if pno >= regs::PORTS {
        return Err(Error::InvalidArgument);
    }
    Ok(())
}

impl<B: SmiBus> Switch<B> {
    pub fn get_enable_vlan(&self) -> bool {
        self.state.vlan_enabled
    }

    pub fn set_enable_vlan(&mut self, enable: bool) {
        self.state.vlan_enabled = enable;
    }

    pub fn get_vid(&self, vno: usize) -> Result<u16> {
        check_vlan(vno)?;
        Ok(self.state.vlans[vno].vid)
    }

    pub fn set_vid(&mut self, vno: usize, vid: u16) -> Result<()> {
        check_vlan(vno)?;
        if vid > regs::PVID_MASK {
            return Err(Error::InvalidArgument);
        }
        self.state.vlans[vno].vid = vid;
        Ok(())
    }

    pub fn get_vlan_port_based(&self, vno: usize) -> Result<bool> {
        check_vlan(vno)?;
        Ok(self.state.vlans[vno].port_based)
    }

    pub fn set_vlan_port_based(&mut self, vno: usize, port_based: bool) -> Result<()> {
        check_vlan(vno)?;
        self.state.vlans[vno].port_based = port_based;
        Ok(())
    }

    pub fn get_port_qmode(&self, pno: usize) -> Result<QMode> {
        check_port(pno)?;
        Ok(self.state.ports[pno].qmode)
    }

    pub fn set_port_qmode(&mut self, pno: usize, value: i32) -> Result<()> {
        check_port(pno)?;
        self.state.ports[pno].qmode = QMode::from_attr(value)?;
        Ok(())
    }

    pub fn get_pvid(&self, pno: usize) -> Result<u16> {
        check_port(pno)?;
        Ok(self.state.ports[pno].pvid)
    }

    /// PVIDs are bounded by the slot count, matching the vid-defaults-to-
    /// slot-number convention of [`Self::set_vlan_ports`].
    pub fn set_pvid(&mut self, pno: usize, pvid: u16) -> Result<()> {
        check_port(pno)?;
        if usize::from(pvid) >= regs::VLANS {
            return Err(Error::InvalidArgument);
        }
        self.state.ports[pno].pvid = pvid;
        Ok(())
    }

    pub fn get_vlan_ports(&self, vno: usize) -> Result<Vec<VlanPort>> {
        check_vlan(vno)?;
        let vlan = &self.state.vlans[vno];
        let mut out = Vec::new();
        for pno in 0..regs::PORTS {
            if vlan.mask & (1 << pno) != 0 {
                out.push(VlanPort {
                    port: pno,
                    tagged: vlan.port_mode.get(pno) == TagMode::Tagged,
                });
            }
        }
        Ok(out)
    }

    /// Replaces slot `vno`'s membership. The slot's vid defaults to the
    /// slot number the first time it gains members.
    pub fn set_vlan_ports(&mut self, vno: usize, members: &[VlanPort]) -> Result<()> {
        check_vlan(vno)?;
        for member in members {
            check_port(member.port)?;
        }

        let vlan = &mut self.state.vlans[vno];
        vlan.mask = 0;
        vlan.port_mode = TagModes::default();

        if vlan.vid == 0 {
            vlan.vid = vno as u16;
        }

        for member in members {
            vlan.mask |= 1 << member.port;
            let mode = if member.tagged {
                TagMode::Tagged
            } else {
                TagMode::Untagged
            };
            vlan.port_mode.set(member.port, mode);
        }

        // Discard is nonzero, so it must be set explicitly on every port
        // outside the VLAN.
        for pno in 0..regs::PORTS {
            if vlan.mask & (1 << pno) == 0 {
                vlan.port_mode.set(pno, TagMode::Discard);
            }
        }

        Ok(())
    }

    /// Human-readable port-based VLAN mask, read from the hardware:
    /// `"0x0003: 0 1 (2) "` lists the members and parenthesizes the port
    /// itself when absent.
    pub fn get_port_mask(&mut self, pno: usize) -> Result<String> {
        check_port(pno)?;
        let reg = self.read(regs::port_addr(pno), regs::PORT_VLANMAP)? & regs::PORT_MASK_ALL;

        let mut buf = format!("{reg:#06x}: ");
        for i in 0..regs::PORTS {
            if reg & (1 << i) != 0 {
                buf.push_str(&format!("{i} "));
            } else if i == pno {
                buf.push_str(&format!("({i}) "));
            }
        }
        Ok(buf)
    }

    /// Live link state, e.g. `"link: up, speed: 1000 Mbps, duplex: full"`.
    pub fn get_port_status(&mut self, pno: usize) -> Result<String> {
        check_port(pno)?;
        let status = self.read(regs::port_addr(pno), regs::PORT_STATUS)?;

        if status & regs::PORT_STATUS_LINK == 0 {
            return Ok("link: down".to_owned());
        }

        let duplex = if status & regs::PORT_STATUS_FDX != 0 {
            "full"
        } else {
            "half"
        };
        Ok(format!(
            "link: up, speed: {} Mbps, duplex: {duplex}",
            speed_mbps(status)
        ))
    }

    /// Live link speed in Mbps; 0 when the link is down.
    pub fn get_port_link(&mut self, pno: usize) -> Result<u32> {
        check_port(pno)?;
        let status = self.read(regs::port_addr(pno), regs::PORT_STATUS)?;

        if status & regs::PORT_STATUS_LINK == 0 {
            return Ok(0);
        }
        Ok(speed_mbps(status))
    }

    /// Name-keyed getter used by the host's CLI layer. `index` is the VLAN
    /// slot or port number; it is ignored for the global domain.
    pub fn get_attr(&mut self, domain: AttrDomain, name: &str, index: usize) -> Result<AttrValue> {
        match (domain, name) {
            (AttrDomain::Global, "enable_vlan") => Ok(AttrValue::Int(self.get_enable_vlan() as i32)),
            (AttrDomain::Vlan, "port_based") => {
                Ok(AttrValue::Int(self.get_vlan_port_based(index)? as i32))
            }
            (AttrDomain::Vlan, "vid") => Ok(AttrValue::Int(i32::from(self.get_vid(index)?))),
            (AttrDomain::Port, "mask") => Ok(AttrValue::Str(self.get_port_mask(index)?)),
            (AttrDomain::Port, "qmode") => Ok(AttrValue::Int(self.get_port_qmode(index)? as i32)),
            (AttrDomain::Port, "status") => Ok(AttrValue::Str(self.get_port_status(index)?)),
            (AttrDomain::Port, "link") => Ok(AttrValue::Int(self.get_port_link(index)? as i32)),
            _ => Err(Error::InvalidArgument),
        }
    }

    /// Name-keyed setter; read-only attributes reject the write.
    pub fn set_attr(
        &mut self,
        domain: AttrDomain,
        name: &str,
        index: usize,
        value: AttrValue,
    ) -> Result<()> {
        match (domain, name, value) {
            (AttrDomain::Global, "enable_vlan", AttrValue::Int(v)) => {
                self.set_enable_vlan(v != 0);
                Ok(())
            }
            (AttrDomain::Vlan, "port_based", AttrValue::Int(v)) => {
                self.set_vlan_port_based(index, v != 0)
            }
            (AttrDomain::Vlan, "vid", AttrValue::Int(v)) => {
                let vid = u16::try_from(v).map_err(|_| Error::InvalidArgument)?;
                self.set_vid(index, vid)
            }
            (AttrDomain::Port, "qmode", AttrValue::Int(v)) => self.set_port_qmode(index, v),
            _ => Err(Error::InvalidArgument),
        }
    }
}

fn speed_mbps(status: u16) -> u32 {
    match (status & regs::PORT_STATUS_SPEED_MASK) >> regs::PORT_STATUS_SPEED_SHIFT {
        regs::PORT_STATUS_SPEED_10 => 10,
        regs::PORT_STATUS_SPEED_100 => 100,
        regs::PORT_STATUS_SPEED_1000 => 1000,
        _ => 0,
    }
}
