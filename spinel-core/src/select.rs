//! Slave-select controller

use spinel_hal::SelectLines;

use crate::transfer::SlaveSelect;

/// Drive the select line to its active level
pub fn assert_slave<G: SelectLines>(lines: &mut G, slave: &SlaveSelect) {
    lines.set_line(slave.pin, slave.polarity.asserted());
}

/// Drive the select line to its inactive level
pub fn release_slave<G: SelectLines>(lines: &mut G, slave: &SlaveSelect) {
    lines.set_line(slave.pin, slave.polarity.released());
}
