//! # QEMU Debug Output
//!
//! Log output for kernels running on the QEMU RISC-V `virt` machine.
//!
//! ## Output Mechanism
//! ```text
//! log::info!(..)
//!     ↓
//! QemuLogger (log::Log)
//!     ↓
//! sink: fn(fmt::Arguments)       ← replaceable, e.g. for host tests
//!     ↓
//! qemu_fmt::qemu_write → 16550 UART at 0x1000_0000
//!     ↓
//! QEMU serial console (-nographic / -serial stdio)
//! ```
//!
//! ## `enabled` Feature (default)
//! When disabled, the default sink discards everything and no MMIO code is
//! compiled in.
//!
//! ## Usage
//! ```rust,no_run
//! use kernel_qemu::QemuLogger;
//! use log::{LevelFilter, info};
//!
//! static LOGGER: QemuLogger = QemuLogger::new(LevelFilter::Debug);
//!
//! LOGGER.init().expect("logger initialization");
//! info!("kernel memory initialized");
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

mod logger;

pub use logger::{QemuLogger, Sink};

#[cfg(feature = "enabled")]
#[doc(hidden)]
pub mod qemu_fmt {
    use core::fmt::{self, Write};
    use core::hint::spin_loop;

    /// MMIO base of the first 16550 UART on the `virt` machine.
    const UART0: usize = 0x1000_0000;
    /// Transmit holding register.
    const THR: usize = 0;
    /// Line status register.
    const LSR: usize = 5;
    /// LSR: transmit holding register empty.
    const LSR_TX_IDLE: u8 = 1 << 5;

    /// Write a single byte to the UART, waiting for room in the transmitter.
    #[inline]
    pub fn uart_putc(c: u8) {
        let base = core::ptr::with_exposed_provenance_mut::<u8>(UART0);
        // SAFETY: UART0 is device memory mapped by the machine; byte
        // accesses to its registers have no other side effects.
        unsafe {
            while base.add(LSR).read_volatile() & LSR_TX_IDLE == 0 {
                spin_loop();
            }
            base.add(THR).write_volatile(c);
        }
    }

    pub struct QemuSink;

    impl Write for QemuSink {
        #[inline]
        fn write_str(&mut self, s: &str) -> fmt::Result {
            for b in s.bytes() {
                uart_putc(b);
            }
            Ok(())
        }
    }

    #[doc(hidden)]
    pub fn qemu_write(args: fmt::Arguments<'_>) {
        // Best-effort debug output.
        let _ = fmt::write(&mut QemuSink, args);
    }
}

#[cfg(not(feature = "enabled"))]
#[doc(hidden)]
pub mod qemu_fmt {
    use core::fmt;

    #[doc(hidden)]
    #[inline(always)]
    #[allow(clippy::inline_always)]
    pub const fn qemu_write(_: fmt::Arguments<'_>) {}
}
