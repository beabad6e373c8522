//! Reset sequencing: disable window, hardware reset, state rebuild.

use mvsw6171::{regs, Error, Switch, VlanPort};
use mvsw_sim::SimSwitch;
use mvsw_smi::SmiMode;

fn configured_switch() -> Switch<SimSwitch> {
    let mut sw = Switch::probe(SimSwitch::new(SmiMode::Direct)).expect("chip present");
    sw.attach();
    sw.set_enable_vlan(true);
    sw.set_vid(1, 100).unwrap();
    sw.set_vlan_ports(
        1,
        &[
            VlanPort {
                port: 0,
                tagged: false,
            },
            VlanPort {
                port: 1,
                tagged: true,
            },
        ],
    )
    .unwrap();
    sw.set_pvid(3, 7).unwrap();
    sw.apply().unwrap();
    sw
}

#[test]
fn reset_clears_software_and_hardware_state() {
    let mut sw = configured_switch();

    sw.reset().unwrap();

    assert!(!sw.get_enable_vlan());
    assert_eq!(sw.get_pvid(0), Ok(0));
    assert_eq!(sw.get_pvid(3), Ok(0));
    assert_eq!(sw.get_port_mask(0).unwrap(), "0x0000: (0) ");
    assert!(sw.get_vlan_ports(1).unwrap().is_empty());
    assert_eq!(sw.get_vid(1), Ok(0));
    assert!(sw.bus().vtu_entries().is_empty());
}

#[test]
fn reset_reenables_ports_and_rewires_port_defaults() {
    let mut sw = configured_switch();

    sw.reset().unwrap();

    for pno in 0..regs::PORTS {
        let bus = sw.bus();
        assert_eq!(
            bus.port_reg(pno, regs::PORT_CONTROL) & regs::PORT_CONTROL_FORWARDING,
            regs::PORT_CONTROL_FORWARDING,
            "port {pno} not re-enabled"
        );
        assert_eq!(
            bus.port_reg(pno, regs::PORT_FORCE) & regs::FORCE_FC_MASK,
            regs::FORCE_FC_DISABLE,
            "port {pno} flow control not forced off"
        );
        assert_eq!(
            bus.port_reg(pno, regs::PORT_ASSOC),
            1 << pno,
            "port {pno} association vector"
        );
    }
}

#[test]
fn ports_are_disabled_before_the_reset_pulse() {
    let mut sw = configured_switch();

    sw.bus_mut().clear_writes();
    sw.reset().unwrap();

    let writes = sw.bus().writes();
    let reset_pos = writes
        .iter()
        .position(|&(addr, reg, value)| {
            addr == regs::GLOBAL
                && reg == regs::GLOBAL_CONTROL
                && value & regs::GLOBAL_CONTROL_RESET != 0
        })
        .expect("reset pulse written");

    // Every port saw its control register written (to a disabled state)
    // before the pulse.
    for pno in 0..regs::PORTS {
        let disable_pos = writes
            .iter()
            .position(|&(addr, reg, value)| {
                addr == regs::port_addr(pno)
                    && reg == regs::PORT_CONTROL
                    && value & regs::PORT_CONTROL_FORWARDING == 0
            })
            .expect("port disabled");
        assert!(disable_pos < reset_pos, "port {pno} disabled after reset");
    }

    // And re-enabled only after it.
    let reenable_pos = writes
        .iter()
        .position(|&(addr, reg, value)| {
            addr == regs::port_addr(0)
                && reg == regs::PORT_CONTROL
                && value & regs::PORT_CONTROL_FORWARDING == regs::PORT_CONTROL_FORWARDING
        })
        .expect("port re-enabled");
    assert!(reset_pos < reenable_pos);
}

#[test]
fn stuck_reset_bit_fails_reset_and_leaves_ports_down() {
    let mut sw = configured_switch();
    // Ports are up after the configured apply+reset-free setup; wedge the
    // reset bit and try again.
    sw.reset().unwrap();
    sw.bus_mut().set_reset_stuck(true);

    assert_eq!(sw.reset(), Err(Error::Timeout));

    for pno in 0..regs::PORTS {
        assert_eq!(
            sw.bus().port_reg(pno, regs::PORT_CONTROL) & regs::PORT_CONTROL_FORWARDING,
            0,
            "port {pno} should stay disabled after a failed reset"
        );
    }
}

#[test]
fn reset_survives_a_wedged_vtu() {
    // The apply() embedded in reset swallows VTU polling timeouts like any
    // other apply; only the reset pulse itself is fatal.
    let mut sw = configured_switch();
    sw.bus_mut().set_vtu_stuck(true);

    assert_eq!(sw.reset(), Ok(()));
    assert!(!sw.get_enable_vlan());
}
