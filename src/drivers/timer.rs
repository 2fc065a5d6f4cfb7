use core::sync::atomic::{AtomicU64, Ordering};

use crate::interrupts::idt::InterruptIndex;
use crate::interrupts::vectors::{self, RegisterFrame};

static TICKS: AtomicU64 = AtomicU64::new(0);

fn irq_handler(_frame: &mut RegisterFrame) {
    TICKS.fetch_add(1, Ordering::Relaxed);
}

pub fn init() {
    vectors::register_handler(InterruptIndex::Timer.as_u8(), irq_handler);
}

pub fn ticks() -> u64 {
    TICKS.load(Ordering::Relaxed)
}
