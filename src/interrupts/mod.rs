pub mod gdt;
pub mod idt;
pub mod vectors;

pub fn init() {
    gdt::init();
    idt::init();
    unsafe { idt::PICS.lock().initialize() };
}
