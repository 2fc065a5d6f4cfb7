//! System identity and power control.

use spin::Mutex;
use x86_64::instructions::port::Port;

static HOSTNAME: Mutex<&'static str> = Mutex::new("oem");
static USERNAME: Mutex<&'static str> = Mutex::new("root");
static SYS_PATH: Mutex<&'static str> = Mutex::new("/");

pub fn hostname() -> &'static str {
    *HOSTNAME.lock()
}

/// Hostnames shorter than two characters are rejected.
pub fn set_hostname(name: &'static str) -> Result<(), ()> {
    if name.len() < 2 {
        return Err(());
    }
    *HOSTNAME.lock() = name;
    Ok(())
}

pub fn username() -> &'static str {
    *USERNAME.lock()
}

pub fn set_username(name: &'static str) {
    *USERNAME.lock() = name;
}

pub fn sys_path() -> &'static str {
    *SYS_PATH.lock()
}

pub fn set_sys_path(path: &'static str) {
    *SYS_PATH.lock() = path;
}

/// Reboot through the keyboard controller reset line.
pub fn reboot() -> ! {
    crate::log_info!("Reboot requested");
    let mut status: Port<u8> = Port::new(0x64);
    // Drain the input buffer before pulsing the reset line
    while unsafe { status.read() } & 0x02 != 0 {}
    unsafe { status.write(0xFE) };
    halt_forever();
}

/// Power off via the emulator management ports. Falls through to a halt
/// on real hardware that does not answer any of them.
pub fn shutdown() -> ! {
    crate::log_info!("Shutdown requested");
    unsafe {
        Port::<u16>::new(0xB004).write(0x2000);
        Port::<u16>::new(0x604).write(0x2000);
        Port::<u16>::new(0x4004).write(0x3400);
    }
    halt_forever();
}

fn halt_forever() -> ! {
    loop {
        x86_64::instructions::hlt();
    }
}

const BANNER: &str = r#"
 _                                  ___  ____
| |   _   _ _ __ ___   ___ _ __    / _ \/ ___|
| |  | | | | '_ ` _ \ / _ \ '_ \  | | | \___ \
| |__| |_| | | | | | |  __/ | | | | |_| |___) |
|_____\__,_|_| |_| |_|\___|_| |_|  \___/|____/
"#;

/// Print the boot banner. Mode 0 goes to the serial log, anything else
/// to the VGA console.
pub fn print_banner(mode: u32) {
    if mode == 0 {
        crate::serial_println!("{}", BANNER);
        crate::serial_println!("  LumenOS v{} on x86_64", env!("CARGO_PKG_VERSION"));
    } else {
        crate::println!("{}", BANNER);
        crate::println!("  LumenOS v{} on x86_64", env!("CARGO_PKG_VERSION"));
    }
}
