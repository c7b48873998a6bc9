use tracing::trace;

use crate::cpu::CoreView;

pub fn trace(view: &CoreView<'_>) {
    trace!(
        "[{:08}] {:?} pc=0x{:08x} pc_next=0x{:08x} mem={:?} x1=0x{:08x} x2=0x{:08x} x10=0x{:08x} x11=0x{:08x}",
        view.cycles(),
        view.state(),
        view.pc(),
        view.pc_next(),
        view.mem_state(),
        view.register(1),
        view.register(2),
        view.register(10),
        view.register(11)
    );
}
