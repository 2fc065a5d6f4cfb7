#![no_std]
#![feature(abi_x86_interrupt)]
#![feature(custom_test_frameworks)]
#![test_runner(crate::test_runner)]
#![reexport_test_harness_main = "test_main"]

pub mod drivers;
pub mod gfx;
pub mod interrupts;
pub mod serial;
pub mod syscalls;
pub mod system;
pub mod triggers;
pub mod vga;

use core::panic::PanicInfo;

fn init() {
    vga::init();
    serial::init();
    interrupts::init();
    log_info!("LumenOS kernel started.");

    syscalls::init();
    drivers::init();
}

#[cfg(not(test))]
#[no_mangle]
pub extern "C" fn _start() -> ! {
    init();
    system::print_banner(1);

    x86_64::instructions::interrupts::enable();

    // Exercise the syscall path end to end before handing the console
    // over.
    syscalls::hello_world_console();

    drivers::mouse::set_draw_state(drivers::mouse::cursor::DrawState::Normal);
    println!("LumenOS is successfully running!");

    loop {
        drivers::mouse::draw();
        x86_64::instructions::hlt();
    }
}

#[cfg(test)]
#[no_mangle]
pub extern "C" fn _start() -> ! {
    init();
    x86_64::instructions::interrupts::enable();
    test_main();
    loop {
        x86_64::instructions::hlt();
    }
}

pub fn test_runner(tests: &[&dyn Fn()]) {
    serial_println!("Running {} tests", tests.len());
    for test in tests {
        test();
    }
    serial_println!("All tests passed.");
}

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    println!("{}", info);
    log_error!("{}", info);
    loop {
        x86_64::instructions::hlt();
    }
}
