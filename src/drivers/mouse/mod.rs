//! PS/2 mouse driver.
//!
//! One byte arrives per IRQ12; the accumulator collects them into
//! packets, the decoder turns packets into motion/button samples, and
//! the device singleton folds samples into the cumulative pointer
//! state. Everything mutable lives in `MouseDevice` behind one lock,
//! written only from the IRQ handler and the explicit setters; readers
//! get snapshots.

pub mod cursor;
pub mod packet;

use bit_field::BitField;
use lazy_static::lazy_static;
use spin::Mutex;
use x86_64::instructions::interrupts;
use x86_64::instructions::port::Port;

use crate::gfx;
use crate::interrupts::idt::InterruptIndex;
use crate::interrupts::vectors::{self, RegisterFrame};
use crate::triggers::{self, KernelEvent};
use crate::{log_info, log_warn};
use cursor::{CursorRenderer, DrawState};
use packet::{MousePacket, PacketAccumulator, BASE_PACKET_LEN};

const DATA_PORT: u16 = 0x60;
const STATUS_PORT: u16 = 0x64;

// Controller commands (port 0x64).
const CMD_ENABLE_AUX: u8 = 0xA8;
const CMD_READ_CONFIG: u8 = 0x20;
const CMD_WRITE_CONFIG: u8 = 0x60;
const CMD_AUX_PREFIX: u8 = 0xD4;

// Device commands (sent through the aux prefix).
const DEV_SET_DEFAULTS: u8 = 0xF6;
const DEV_ENABLE_STREAMING: u8 = 0xF4;

/// Retry budget for every controller-ready poll during bring-up.
const WAIT_RETRIES: u32 = 100;

pub struct MouseDevice {
    x: i32,
    y: i32,
    left: bool,
    right: bool,
    middle: bool,
    button_4: bool,
    button_5: bool,
    /// Accumulates across packets; reset by `take_wheel`, never by the
    /// IRQ path.
    wheel: i32,
    last_packet: MousePacket,
    accumulator: PacketAccumulator,
    has_wheel: bool,
    has_five_buttons: bool,
    renderer: CursorRenderer,
    ready: bool,
}

impl MouseDevice {
    pub const fn new() -> Self {
        MouseDevice {
            x: 0,
            y: 0,
            left: false,
            right: false,
            middle: false,
            button_4: false,
            button_5: false,
            wheel: 0,
            last_packet: MousePacket {
                dx: 0,
                dy: 0,
                left: false,
                right: false,
                middle: false,
                wheel: 0,
                extra_button: false,
            },
            accumulator: PacketAccumulator::new(BASE_PACKET_LEN),
            has_wheel: false,
            has_five_buttons: false,
            renderer: CursorRenderer::empty(),
            ready: false,
        }
    }

    /// Fold one decoded packet into the cumulative state. Device Y is
    /// inverted relative to screen Y, so the Y delta is subtracted.
    /// Returns the button event to publish when any principal button is
    /// held.
    fn apply_packet(&mut self, packet: &MousePacket) -> Option<KernelEvent> {
        self.x += packet.dx as i32;
        self.y -= packet.dy as i32;
        self.left = packet.left;
        self.right = packet.right;
        self.middle = packet.middle;
        self.wheel += packet.wheel as i32;
        if self.has_five_buttons {
            self.button_4 = packet.extra_button;
        }
        self.last_packet = *packet;

        if packet.left || packet.right || packet.middle {
            Some(KernelEvent::MouseButtons {
                left: packet.left,
                right: packet.right,
                middle: packet.middle,
                x: self.x,
                y: self.y,
            })
        } else {
            None
        }
    }

    /// Saturate the position into [0, width] x [0, height].
    fn clamp_to_screen(&mut self, width: i32, height: i32) {
        self.x = self.x.clamp(0, width);
        self.y = self.y.clamp(0, height);
    }
}

lazy_static! {
    static ref DEVICE: Mutex<MouseDevice> = Mutex::new(MouseDevice::new());
}

// ── Controller plumbing ───────────────────────────────────────────────

/// Poll until the controller will accept a command/data byte (status
/// bit 1 clear). Gives up after the retry budget.
fn wait_signal() {
    let mut status: Port<u8> = Port::new(STATUS_PORT);
    for _ in 0..WAIT_RETRIES {
        if !unsafe { status.read() }.get_bit(1) {
            return;
        }
    }
    log_warn!("PS/2 controller input buffer never drained");
}

/// Poll until the controller has a byte for us (status bit 0 set).
fn wait_data() {
    let mut status: Port<u8> = Port::new(STATUS_PORT);
    for _ in 0..WAIT_RETRIES {
        if unsafe { status.read() }.get_bit(0) {
            return;
        }
    }
    log_warn!("PS/2 controller produced no data");
}

fn command(cmd: u8) {
    wait_signal();
    unsafe { Port::<u8>::new(STATUS_PORT).write(cmd) };
}

/// Send one byte to the mouse itself (via the aux prefix).
fn write_device(data: u8) {
    command(CMD_AUX_PREFIX);
    wait_signal();
    unsafe { Port::<u8>::new(DATA_PORT).write(data) };
}

fn read_data() -> u8 {
    wait_data();
    unsafe { Port::<u8>::new(DATA_PORT).read() }
}

// ── IRQ path ──────────────────────────────────────────────────────────

/// IRQ12 handler. Consumes nothing unless the status register says a
/// byte is pending *and* it came from the aux device.
fn irq_handler(_frame: &mut RegisterFrame) {
    let status = unsafe { Port::<u8>::new(STATUS_PORT).read() };
    if !status.get_bit(0) || !status.get_bit(5) {
        return;
    }
    let byte = unsafe { Port::<u8>::new(DATA_PORT).read() };

    let mut button_event = None;
    let mut moved_event = None;
    {
        let mut dev = DEVICE.lock();
        let (has_wheel, has_five) = (dev.has_wheel, dev.has_five_buttons);
        if let Some(raw) = dev.accumulator.push(byte) {
            let len = dev.accumulator.packet_len();
            // Malformed packets are dropped here; position and buttons
            // stay untouched.
            if let Some(packet) = packet::decode(&raw[..len], has_wheel, has_five) {
                button_event = dev.apply_packet(&packet);
            }
            dev.clamp_to_screen(gfx::screen_width() as i32, gfx::screen_height() as i32);
            moved_event = Some(KernelEvent::MouseMoved { x: dev.x, y: dev.y });
        }
    }
    if let Some(event) = button_event {
        triggers::publish(&event);
    }
    if let Some(event) = moved_event {
        triggers::publish(&event);
    }
}

// ── Driver lifecycle ──────────────────────────────────────────────────

/// Bring the device up and bind IRQ12.
pub fn install() {
    DEVICE.lock().renderer.load_sprites();

    // Enable the auxiliary device.
    command(CMD_ENABLE_AUX);

    // Unmask the mouse interrupt in the controller config byte.
    command(CMD_READ_CONFIG);
    wait_data();
    let config = unsafe { Port::<u8>::new(DATA_PORT).read() } | 0x02;
    command(CMD_WRITE_CONFIG);
    wait_signal();
    unsafe { Port::<u8>::new(DATA_PORT).write(config) };

    // Defaults, then streaming; each command answers with an ACK byte.
    write_device(DEV_SET_DEFAULTS);
    let _ack = read_data();
    write_device(DEV_ENABLE_STREAMING);
    let _ack = read_data();

    {
        let mut dev = DEVICE.lock();
        dev.x = gfx::screen_width() as i32 / 2;
        dev.y = gfx::screen_height() as i32 / 2;
        dev.ready = true;
    }

    vectors::register_handler(InterruptIndex::Mouse.as_u8(), irq_handler);
    log_info!("PS/2 mouse driver installed (config {:#04x})", config);
}

/// The IRQ handler takes the device lock, so every other path must
/// hold it with IRQ delivery suppressed or a mid-section interrupt
/// would spin forever on a single core.
fn with_device<R>(f: impl FnOnce(&mut MouseDevice) -> R) -> R {
    interrupts::without_interrupts(|| f(&mut DEVICE.lock()))
}

pub fn is_ready() -> bool {
    with_device(|dev| dev.ready)
}

// ── Snapshot accessors ────────────────────────────────────────────────

pub fn position() -> (i32, i32) {
    with_device(|dev| (dev.x, dev.y))
}

pub fn buttons() -> (bool, bool, bool) {
    with_device(|dev| (dev.left, dev.right, dev.middle))
}

pub fn extra_buttons() -> (bool, bool) {
    with_device(|dev| (dev.button_4, dev.button_5))
}

pub fn last_packet() -> MousePacket {
    with_device(|dev| dev.last_packet)
}

/// Read and reset the accumulated wheel movement. The IRQ path only
/// ever adds; consumers own the reset.
pub fn take_wheel() -> i32 {
    with_device(|dev| {
        let wheel = dev.wheel;
        dev.wheel = 0;
        wheel
    })
}

// ── Cursor drawing ────────────────────────────────────────────────────

pub fn set_draw_state(state: DrawState) {
    with_device(|dev| dev.renderer.set_state(state));
}

pub fn draw_state() -> DrawState {
    with_device(|dev| dev.renderer.state())
}

/// Render the cursor at its current position and step the animation.
pub fn draw() {
    with_device(|dev| {
        let (x, y) = (dev.x, dev.y);
        dev.renderer.draw(x, y);
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device_at(x: i32, y: i32) -> MouseDevice {
        let mut dev = MouseDevice::new();
        dev.x = x;
        dev.y = y;
        dev
    }

    fn feed(dev: &mut MouseDevice, bytes: &[u8]) -> Option<KernelEvent> {
        let mut event = None;
        for &byte in bytes {
            if let Some(raw) = dev.accumulator.push(byte) {
                let len = dev.accumulator.packet_len();
                if let Some(packet) = packet::decode(&raw[..len], dev.has_wheel, dev.has_five_buttons)
                {
                    event = dev.apply_packet(&packet);
                }
            }
        }
        event
    }

    #[test_case]
    fn motion_packet_moves_cursor_with_inverted_y() {
        let mut dev = device_at(100, 100);
        let event = feed(&mut dev, &[0x08, 5, 3]);
        assert_eq!((dev.x, dev.y), (105, 97));
        assert!(event.is_none());
    }

    #[test_case]
    fn negative_y_delta_moves_down_screen() {
        // Y_SIGN set, byte2 = 0xFD → dy = -3 → screen y increases.
        let mut dev = device_at(100, 100);
        feed(&mut dev, &[0x28, 5, 0xFD]);
        assert_eq!((dev.x, dev.y), (105, 103));
    }

    #[test_case]
    fn partial_packet_leaves_state_alone() {
        let mut dev = device_at(10, 10);
        feed(&mut dev, &[0x08, 50]);
        assert_eq!((dev.x, dev.y), (10, 10));
        assert_eq!(dev.accumulator.count(), 2);
    }

    #[test_case]
    fn malformed_packet_is_dropped() {
        let mut dev = device_at(10, 10);
        dev.left = false;
        // X overflow set
        feed(&mut dev, &[0x48, 50, 50]);
        assert_eq!((dev.x, dev.y), (10, 10));
        assert!(!dev.left);
        // Mandatory bit clear
        feed(&mut dev, &[0x00, 50, 50]);
        assert_eq!((dev.x, dev.y), (10, 10));
    }

    #[test_case]
    fn held_button_produces_event_with_position() {
        let mut dev = device_at(100, 100);
        let event = feed(&mut dev, &[0x09, 1, 0]);
        assert_eq!(
            event,
            Some(KernelEvent::MouseButtons {
                left: true,
                right: false,
                middle: false,
                x: 101,
                y: 100,
            })
        );
        assert!(dev.left);
    }

    #[test_case]
    fn clamp_saturates_at_screen_edges() {
        let mut dev = device_at(-5, 50);
        dev.clamp_to_screen(800, 600);
        assert_eq!((dev.x, dev.y), (0, 50));

        let mut dev = device_at(900, 700);
        dev.clamp_to_screen(800, 600);
        assert_eq!((dev.x, dev.y), (800, 600));

        // Boundary positions are already in range.
        let mut dev = device_at(800, 600);
        dev.clamp_to_screen(800, 600);
        assert_eq!((dev.x, dev.y), (800, 600));
    }

    #[test_case]
    fn wheel_accumulates_until_consumer_reset() {
        let mut dev = MouseDevice::new();
        dev.has_wheel = true;
        dev.accumulator = PacketAccumulator::new(packet::WHEEL_PACKET_LEN);
        feed(&mut dev, &[0x08, 0, 0, 0x01]);
        feed(&mut dev, &[0x08, 0, 0, 0x01]);
        feed(&mut dev, &[0x08, 0, 0, 0x0F]);
        assert_eq!(dev.wheel, 1);

        let taken = dev.wheel;
        dev.wheel = 0;
        assert_eq!(taken, 1);
        assert_eq!(dev.wheel, 0);
    }

    #[test_case]
    fn sign_extended_motion_matches_wire_format() {
        // X_SIGN with byte1 = 0xF0 → dx = -16.
        let mut dev = device_at(100, 100);
        feed(&mut dev, &[0x18, 0xF0, 0]);
        assert_eq!(dev.x, 84);
        assert_eq!(dev.last_packet.dx, -16);
    }
}
