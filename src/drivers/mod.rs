pub mod mouse;
pub mod timer;

pub fn init() {
    timer::init();
    mouse::install();
    crate::log_info!("Drivers subsystem initialized.");
}
