//! Configuration engine for the Marvell 88E6171 7-port gigabit switch.
//!
//! The driver keeps a declarative model of the switch's VLAN and port
//! configuration ([`SwitchState`]) that attribute accessors mutate without
//! touching the hardware. An explicit [`Switch::apply`] derives the
//! hardware-table contents (VTU entries, per-port VLAN masks, PVIDs,
//! 802.1Q modes) from that model and programs them over the management
//! bus in dependency order; [`Switch::reset`] rebuilds everything from a
//! cleared model behind a port-disable window.
//!
//! Register access goes through [`mvsw_smi`], which hides whether the chip
//! is strapped for direct or indirect addressing.

pub mod attrs;
mod error;
pub mod reconcile;
pub mod regs;
pub mod state;
mod switch;

pub use attrs::{AttrDomain, AttrValue, VlanPort};
pub use error::{Error, Result};
pub use reconcile::reconcile;
pub use state::{PortEntry, QMode, SwitchState, TagMode, TagModes, VlanEntry};
pub use switch::Switch;
