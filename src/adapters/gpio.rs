//! Memory-mapped GPIO adapter for the Raspberry Pi (`/dev/gpiomem`).
//!
//! Register layout is the BCM283x GPIO block: GPFSEL for pin function,
//! GPSET/GPCLR for output levels, GPLEV for input levels, and the
//! GPPUD/GPPUDCLK pair for the input pull-ups.  Each instance opens its
//! own mapping, so the relay driver and the button task can hold
//! independent single-owner handles.

use std::fs::OpenOptions;
use std::os::unix::io::AsRawFd;

use crate::error::GpioError;
use crate::ports::{Button, ButtonPort, Relay, RelayPort};

const GPIO_MAP_SIZE: usize = 4096;

const GPFSEL_OFFSET: usize = 0x00;
const GPSET_OFFSET: usize = 0x1C;
const GPCLR_OFFSET: usize = 0x28;
const GPLEV_OFFSET: usize = 0x34;
const GPPUD_OFFSET: usize = 0x94;
const GPPUDCLK_OFFSET: usize = 0x98;

const PULL_UP: u32 = 0b10;

/// BCM pin numbers for the relay outputs.
const fn relay_pin(relay: Relay) -> u32 {
    match relay {
        Relay::Compressor => 17,
        Relay::Fan => 27,
        Relay::Valve => 22,
        Relay::ElectricHeater => 23,
    }
}

/// BCM pin numbers for the button inputs.
const fn button_pin(button: Button) -> u32 {
    match button {
        Button::Up => 6,
        Button::Down => 13,
        Button::Defrost => 25,
        Button::Alarm => 5,
    }
}

pub struct RpiGpio {
    base: *mut u32,
    _file: std::fs::File,
}

// The mapping is a plain process-wide MMIO window; moving the handle to
// another thread is fine.  Only the owning task ever uses it.
unsafe impl Send for RpiGpio {}

impl RpiGpio {
    /// Open `/dev/gpiomem` and claim the four relay outputs and four
    /// button inputs (with pull-ups).
    pub fn open() -> Result<Self, GpioError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open("/dev/gpiomem")
            .map_err(|e| GpioError::Io(format!("/dev/gpiomem: {e}")))?;

        let base = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                GPIO_MAP_SIZE,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                file.as_raw_fd(),
                0,
            )
        };
        if base == libc::MAP_FAILED {
            return Err(GpioError::Io("mmap failed".to_string()));
        }

        let gpio = Self {
            base: base as *mut u32,
            _file: file,
        };
        for relay in Relay::ALL {
            gpio.set_output(relay_pin(relay));
        }
        for button in Button::ALL {
            gpio.set_input(button_pin(button));
            gpio.set_pull_up(button_pin(button));
        }
        Ok(gpio)
    }

    fn reg(&self, byte_offset: usize) -> *mut u32 {
        // Offsets are compile-time constants well inside the 4 KiB map.
        unsafe { self.base.add(byte_offset / 4) }
    }

    fn set_output(&self, pin: u32) {
        let reg = self.reg(GPFSEL_OFFSET + 4 * (pin as usize / 10));
        let shift = (pin % 10) * 3;
        unsafe {
            let mut value = reg.read_volatile();
            value &= !(0b111 << shift);
            value |= 0b001 << shift;
            reg.write_volatile(value);
        }
    }

    fn set_input(&self, pin: u32) {
        let reg = self.reg(GPFSEL_OFFSET + 4 * (pin as usize / 10));
        let shift = (pin % 10) * 3;
        unsafe {
            let mut value = reg.read_volatile();
            value &= !(0b111 << shift);
            reg.write_volatile(value);
        }
    }

    /// BCM283x pull sequence: latch the control value, clock the pin,
    /// then release both.
    fn set_pull_up(&self, pin: u32) {
        let pud = self.reg(GPPUD_OFFSET);
        let clk = self.reg(GPPUDCLK_OFFSET + 4 * (pin as usize / 32));
        unsafe {
            pud.write_volatile(PULL_UP);
            spin_delay();
            clk.write_volatile(1 << (pin % 32));
            spin_delay();
            pud.write_volatile(0);
            clk.write_volatile(0);
        }
    }

    fn write_level(&self, pin: u32, level: bool) {
        let offset = if level { GPSET_OFFSET } else { GPCLR_OFFSET };
        let reg = self.reg(offset + 4 * (pin as usize / 32));
        unsafe { reg.write_volatile(1 << (pin % 32)) };
    }

    fn read_level(&self, pin: u32) -> bool {
        let reg = self.reg(GPLEV_OFFSET + 4 * (pin as usize / 32));
        unsafe { reg.read_volatile() & (1 << (pin % 32)) != 0 }
    }
}

impl Drop for RpiGpio {
    fn drop(&mut self) {
        unsafe {
            libc::munmap(self.base as *mut libc::c_void, GPIO_MAP_SIZE);
        }
    }
}

impl RelayPort for RpiGpio {
    fn write(&mut self, relay: Relay, level: bool) -> Result<(), GpioError> {
        self.write_level(relay_pin(relay), level);
        Ok(())
    }
}

impl ButtonPort for RpiGpio {
    fn read(&mut self, button: Button) -> Result<bool, GpioError> {
        Ok(self.read_level(button_pin(button)))
    }
}

/// The datasheet asks for ~150 cycles of settle time around the pull
/// clock; a microsecond sleep is comfortably above that.
fn spin_delay() {
    std::thread::sleep(std::time::Duration::from_micros(1));
}
