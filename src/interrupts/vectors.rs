//! Software interrupt-vector table and the trap-entry stubs feeding it.
//!
//! The CPU-side IDT (idt.rs) points the hardware-IRQ range and the
//! syscall gate at tiny naked stubs generated here. Each stub pushes its
//! vector number, spills every general-purpose register to form a
//! `RegisterFrame`, and hands that frame to `trap_dispatch`, which looks
//! the vector up in a 256-entry handler table. Handlers mutate the frame
//! in place; whatever ends up in `rax` is what the interrupted code sees
//! after `iretq`.

use core::arch::naked_asm;
use spin::Mutex;

use super::idt::{PICS, PIC_1_OFFSET};

/// Software-interrupt vector reserved for syscalls.
pub const SYSCALL_VECTOR: u8 = 0x50;

const PIC_VECTOR_COUNT: u8 = 16;

/// Snapshot of CPU state at trap entry. Field order matches the push
/// sequence in `trap_entry` exactly: the last register pushed sits at
/// the lowest address. Fields are only valid for the duration of one
/// handler invocation.
#[derive(Debug, Clone, Copy, Default)]
#[repr(C)]
pub struct RegisterFrame {
    pub r15: u64,
    pub r14: u64,
    pub r13: u64,
    pub r12: u64,
    pub r11: u64,
    pub r10: u64,
    pub r9: u64,
    pub r8: u64,
    pub rbp: u64,
    pub rdi: u64,
    pub rsi: u64,
    pub rdx: u64,
    pub rcx: u64,
    pub rbx: u64,
    pub rax: u64,
    /// Vector number pushed by the per-vector stub.
    pub vector: u64,
    // Pushed by the CPU on interrupt entry.
    pub rip: u64,
    pub cs: u64,
    pub rflags: u64,
    pub rsp: u64,
    pub ss: u64,
}

pub type TrapHandler = fn(&mut RegisterFrame);

static HANDLERS: Mutex<[Option<TrapHandler>; 256]> = Mutex::new([None; 256]);

/// Install `handler` for `vector`. A second registration for the same
/// vector replaces the first; there is no removal.
pub fn register_handler(vector: u8, handler: TrapHandler) {
    HANDLERS.lock()[vector as usize] = Some(handler);
}

/// Common dispatch, reached only from the trap-entry stub below. A
/// hardware vector nobody registered for is ignored (the PIC still gets
/// its EOI); the syscall vector without a dispatcher means boot-order
/// breakage and is fatal.
extern "C" fn trap_dispatch(frame: &mut RegisterFrame) {
    let vector = frame.vector as u8;
    let handler = HANDLERS.lock()[vector as usize];
    match handler {
        Some(handler) => handler(frame),
        None if vector == SYSCALL_VECTOR => {
            panic!("syscall trap fired with no dispatcher registered")
        }
        None => {}
    }
    if (PIC_1_OFFSET..PIC_1_OFFSET + PIC_VECTOR_COUNT).contains(&vector) {
        unsafe {
            PICS.lock().notify_end_of_interrupt(vector);
        }
    }
}

/// Shared trap entry. On arrival the stack holds the CPU interrupt
/// frame plus the vector number pushed by the per-vector stub; after
/// spilling the fifteen GPRs, RSP points at a complete `RegisterFrame`.
#[unsafe(naked)]
extern "C" fn trap_entry() {
    naked_asm!(
        "push rax",
        "push rbx",
        "push rcx",
        "push rdx",
        "push rsi",
        "push rdi",
        "push rbp",
        "push r8",
        "push r9",
        "push r10",
        "push r11",
        "push r12",
        "push r13",
        "push r14",
        "push r15",
        // CPU frame (5) + vector (1) + GPRs (15) = 21 qwords, so RSP is
        // 8 short of the 16-byte alignment the System V ABI wants at a
        // call site.
        "mov rdi, rsp",
        "sub rsp, 8",
        "call {dispatch}",
        "add rsp, 8",
        "pop r15",
        "pop r14",
        "pop r13",
        "pop r12",
        "pop r11",
        "pop r10",
        "pop r9",
        "pop r8",
        "pop rbp",
        "pop rdi",
        "pop rsi",
        "pop rdx",
        "pop rcx",
        "pop rbx",
        "pop rax",
        // Drop the vector number
        "add rsp, 8",
        "iretq",
        dispatch = sym trap_dispatch,
    );
}

macro_rules! vector_stub {
    ($name:ident, $vector:expr) => {
        #[unsafe(naked)]
        extern "C" fn $name() {
            naked_asm!(
                "push {vector}",
                "jmp {entry}",
                vector = const $vector,
                entry = sym trap_entry,
            );
        }
    };
}

vector_stub!(stub_32, 32);
vector_stub!(stub_33, 33);
vector_stub!(stub_34, 34);
vector_stub!(stub_35, 35);
vector_stub!(stub_36, 36);
vector_stub!(stub_37, 37);
vector_stub!(stub_38, 38);
vector_stub!(stub_39, 39);
vector_stub!(stub_40, 40);
vector_stub!(stub_41, 41);
vector_stub!(stub_42, 42);
vector_stub!(stub_43, 43);
vector_stub!(stub_44, 44);
vector_stub!(stub_45, 45);
vector_stub!(stub_46, 46);
vector_stub!(stub_47, 47);
vector_stub!(stub_syscall, 0x50);

/// Entry stubs for the remapped PIC range, indexed by IRQ line.
pub static IRQ_STUBS: [extern "C" fn(); PIC_VECTOR_COUNT as usize] = [
    stub_32, stub_33, stub_34, stub_35, stub_36, stub_37, stub_38, stub_39, stub_40, stub_41,
    stub_42, stub_43, stub_44, stub_45, stub_46, stub_47,
];

/// Entry stub for the syscall gate.
pub static SYSCALL_STUB: extern "C" fn() = stub_syscall;

#[cfg(test)]
mod tests {
    use super::*;

    // Vectors above the PIC range and away from the syscall gate, so
    // dispatching synthetic frames has no hardware side effects. Each
    // test owns its vector; the handler table is process-wide.
    const FREE_VECTOR: u8 = 0x70;
    const SILENT_VECTOR: u8 = 0x71;
    const MARKED_VECTOR: u8 = 0x72;

    fn mark_a(frame: &mut RegisterFrame) {
        frame.rax = 0xA;
    }

    fn mark_b(frame: &mut RegisterFrame) {
        frame.rax = 0xB;
    }

    #[test_case]
    fn frame_layout_is_dense() {
        assert_eq!(core::mem::size_of::<RegisterFrame>(), 21 * 8);
    }

    #[test_case]
    fn registration_is_last_writer_wins() {
        register_handler(FREE_VECTOR, mark_a);
        register_handler(FREE_VECTOR, mark_b);

        let mut frame = RegisterFrame::default();
        frame.vector = FREE_VECTOR as u64;
        trap_dispatch(&mut frame);
        assert_eq!(frame.rax, 0xB);
    }

    #[test_case]
    fn unregistered_hardware_vector_is_ignored() {
        let mut frame = RegisterFrame::default();
        frame.vector = SILENT_VECTOR as u64;
        frame.rax = 0x1234;
        trap_dispatch(&mut frame);
        assert_eq!(frame.rax, 0x1234);
    }

    #[test_case]
    fn handler_mutations_land_in_the_frame() {
        register_handler(MARKED_VECTOR, mark_a);
        let mut frame = RegisterFrame::default();
        frame.vector = MARKED_VECTOR as u64;
        trap_dispatch(&mut frame);
        assert_eq!(frame.rax, 0xA);
    }
}
