//! Octogate is [Embassy](https://embassy.dev)-based firmware for an eight-channel MIDI to
//! [CV/gate](https://en.wikipedia.org/wiki/CV/gate) Eurorack interface. The firmware runs on the [Nucleo-F767ZI
//! development board](https://www.st.com/en/evaluation-tools/nucleo-f767zi.html), which is powered by an F7-series
//! STM32 microcontroller.
//!
//! MIDI arrives over a DIN input (UART at 31,250 baud) or USB. Each of the eight channels pairs a gate output with a
//! channel of a MAX5825 DAC, and a mapping table decides which messages drive which channel and how. The table is
//! built on the device through MIDI learn, using the board's user button and red LED, or received in one piece as
//! a SysEx frame, and it survives power cycles in the internal flash.
//!
//! All of the behavior lives in `octogate_lib`; this crate only connects it to the hardware.

#![no_std]
#![no_main]

mod board;
mod dac;
mod storage;

use crate::{board::Board, dac::Max5825, storage::FlashStorage};
use defmt::{panic, *};
use embassy_executor::Spawner;
use embassy_stm32::{
    Config, bind_interrupts,
    flash::Flash,
    gpio::{Input, Level, Output, Pull, Speed},
    i2c::{self, I2c},
    mode::{Async, Blocking},
    peripherals,
    time::Hertz,
    usart::{self, UartRx},
    usb,
};
use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, mutex};
use embassy_time::{Duration, Ticker, Timer};
use embassy_usb::{Builder, UsbDevice, class::midi::MidiClass, driver::EndpointError};
use octogate_lib::{
    NUM_GATES, TICK_MS,
    button::Button,
    device::Device,
    dispatch::Outputs,
    led::Blinker,
    midi_event::{Parser, Received, usb_midi_payload},
};
use static_cell::StaticCell;

use {defmt_rtt as _, panic_probe as _};

bind_interrupts!(
    #[doc(hidden)]
    struct Irqs {
        OTG_FS => usb::InterruptHandler<peripherals::USB_OTG_FS>;
        USART2 => usart::InterruptHandler<peripherals::USART2>;
    }
);

type UsbDriver = usb::Driver<'static, peripherals::USB_OTG_FS>;
type BoardOutputs = Board<I2c<'static, Blocking>>;
type DeviceAsyncMutex = mutex::Mutex<CriticalSectionRawMutex, Device<BoardOutputs>>;

/// MIDI over DIN runs at a fixed rate.
const MIDI_BAUD: u32 = 31_250;

/// How long each gate lights during the start-up sweep.
const SWEEP_MS: u64 = 50;

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Initializing Octogate");

    let mut config = Config::default();
    {
        use embassy_stm32::rcc::*;
        // hse: high-speed external clock
        config.rcc.hse = Some(Hse {
            freq: Hertz(8_000_000),
            mode: HseMode::Bypass,
        });

        // pll: phase-locked loop, crucial for dividing clock
        config.rcc.pll_src = PllSource::HSE;
        config.rcc.pll = Some(Pll {
            prediv: PllPreDiv::DIV4,
            mul: PllMul::MUL216,
            divp: Some(PllPDiv::DIV2), // 8mhz / 4 * 216 / 2 = 216Mhz
            // per section 5.2 of RM0410: the 48MHz clock used for USB OTG FS is derived from main PLL VCO (PLLQ clock)
            divq: Some(PllQDiv::DIV9), // 8mhz / 4 * 216 / 9 = 48Mhz
            divr: None,
        });
        config.rcc.ahb_pre = AHBPrescaler::DIV1;
        config.rcc.apb1_pre = APBPrescaler::DIV4;
        config.rcc.apb2_pre = APBPrescaler::DIV2;
        config.rcc.sys = Sysclk::PLL1_P;
        config.rcc.mux.clk48sel = mux::Clk48sel::PLL1_Q;
    }
    let p = embassy_stm32::init(config);

    // the DAC sits on I2C1: SCL on port B, pin 8 and SDA on port B, pin 9
    let i2c = I2c::new_blocking(p.I2C1, p.PB8, p.PB9, Hertz(400_000), i2c::Config::default());
    let mut dac = Max5825::new(i2c);
    if dac.init().is_err() {
        error!("DAC did not acknowledge initialization");
    }

    let gates = [
        Output::new(p.PE2, Level::Low, Speed::Low),
        Output::new(p.PE3, Level::Low, Speed::Low),
        Output::new(p.PE4, Level::Low, Speed::Low),
        Output::new(p.PE5, Level::Low, Speed::Low),
        Output::new(p.PE6, Level::Low, Speed::Low),
        Output::new(p.PE7, Level::Low, Speed::Low),
        Output::new(p.PE8, Level::Low, Speed::Low),
        Output::new(p.PE9, Level::Low, Speed::Low),
    ];
    let mut board = Board::new(gates, dac);

    // sweep the gates so a glance at the panel confirms every output works
    for channel in 0..NUM_GATES {
        board.set_gate(channel, true);
        Timer::after_millis(SWEEP_MS).await;
        board.set_gate(channel, false);
    }

    let mut storage = FlashStorage::new(Flash::new_blocking(p.FLASH));
    let mut device = Device::new(board);
    if let Err(e) = device.load(&mut storage) {
        error!("Failed to load mapping table: {}", e);
    }

    static DEVICE: StaticCell<DeviceAsyncMutex> = StaticCell::new();
    let device = DEVICE.init(mutex::Mutex::new(device));

    let button = Input::new(p.PC13, Pull::None);
    let red_led = Output::new(p.PB14, Level::Low, Speed::Low);
    unwrap!(spawner.spawn(control_task(button, red_led, storage, device)));

    let mut uart_config = usart::Config::default();
    uart_config.baudrate = MIDI_BAUD;
    // DIN MIDI arrives on USART2: RX on port D, pin 6
    let din = unwrap!(UartRx::new(p.USART2, Irqs, p.PD6, p.DMA1_CH5, uart_config));
    unwrap!(spawner.spawn(din_midi_task(din, device)));

    // Create the driver, from the HAL.
    static ENDPOINT_OUT_BUFFER: StaticCell<[u8; 256]> = StaticCell::new();
    let mut config = embassy_stm32::usb::Config::default();

    // USB devices which are self-powered (i.e., that can stay powered on if unplugged from the host)
    // need to enable vbus_detection to comply with the USB spec. Per section 6.10 of the Nucleo board
    // manual (UM1974), CN13 (the USB port) cannot power the board; external power is necessary.
    // See docs on `vbus_detection` for details.
    config.vbus_detection = true;

    let driver = usb::Driver::new_fs(
        p.USB_OTG_FS,
        Irqs,
        p.PA12,
        p.PA11,
        ENDPOINT_OUT_BUFFER.init([0; 256]),
        config,
    );

    // per https://pid.codes, FOSS projects can apply to be listed under the vendor ID owned by InterBiometrics
    let vendor_id = 0x1209;
    let product_id = 0x0808;

    let mut config = embassy_usb::Config::new(vendor_id, product_id);
    config.manufacturer = Some("Pawpaw Works");
    config.product = Some("Octogate");
    config.self_powered = true;
    config.max_power = 0;

    // Create embassy-usb DeviceBuilder using the driver and config.
    // It needs some buffers for building the descriptors.
    static CONFIG_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
    static BOS_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
    static CONTROL_BUFFER: StaticCell<[u8; 64]> = StaticCell::new();

    let mut builder = Builder::new(
        driver,
        config,
        CONFIG_DESCRIPTOR.init([0; 256]),
        BOS_DESCRIPTOR.init([0; 256]),
        &mut [], // no msos descriptors
        CONTROL_BUFFER.init([0; 64]),
    );

    // Create classes on the builder.
    let class = MidiClass::new(&mut builder, 0, 1, 64);

    // Build the builder.
    let usb = builder.build();

    unwrap!(spawner.spawn(usb_task(usb)));
    unwrap!(spawner.spawn(usb_midi_task(class, device)));
}

/// Runs the device's control loop every [`TICK_MS`], debouncing the button and animating the LED along the way.
#[embassy_executor::task]
async fn control_task(
    button_pin: Input<'static>,
    mut led: Output<'static>,
    mut storage: FlashStorage,
    device: &'static DeviceAsyncMutex,
) -> ! {
    let mut ticker = Ticker::every(Duration::from_millis(TICK_MS.into()));
    let mut button = Button::default();
    let mut blinker = Blinker::default();

    loop {
        ticker.next().await;
        let button_state = button.update(button_pin.is_high());

        let mut device = device.lock().await;
        if let Err(e) = device.tick(button_state, &mut storage) {
            error!("Failed to access mapping table storage: {}", e);
        }
        led.set_level(Level::from(blinker.tick(device.led_pattern())));
    }
}

/// Hands whatever the parser completes to the device.
async fn deliver(received: Received, device: &'static DeviceAsyncMutex) {
    match received {
        Received::Event(event) => {
            debug!("Received {}", event);
            device.lock().await.receive(event);
        }
        Received::SysEx(sysex) => {
            info!("Received {}", sysex);
            device.lock().await.receive_sysex(&sysex);
        }
    }
}

/// Reads MIDI from the DIN input.
#[embassy_executor::task]
async fn din_midi_task(mut rx: UartRx<'static, Async>, device: &'static DeviceAsyncMutex) -> ! {
    let mut parser = Parser::new();
    let mut buf = [0; 32];
    loop {
        match rx.read_until_idle(&mut buf).await {
            Ok(n) => {
                for byte in &buf[..n] {
                    if let Some(received) = parser.feed(*byte) {
                        deliver(received, device).await;
                    }
                }
            }
            Err(e) => warn!("DIN MIDI read failed: {}", e),
        }
    }
}

#[embassy_executor::task]
async fn usb_task(mut usb: UsbDevice<'static, UsbDriver>) -> ! {
    usb.run().await
}

#[embassy_executor::task]
async fn usb_midi_task(mut class: MidiClass<'static, UsbDriver>, device: &'static DeviceAsyncMutex) -> ! {
    loop {
        class.wait_connection().await;
        info!("USB connected");
        let _ = process_usb_midi(&mut class, device).await;
        info!("USB disconnected");
    }
}

#[doc(hidden)]
struct Disconnected {}

impl From<EndpointError> for Disconnected {
    fn from(val: EndpointError) -> Self {
        match val {
            EndpointError::BufferOverflow => panic!("Buffer overflow"),
            EndpointError::Disabled => Disconnected {},
        }
    }
}

/// Helper function which interprets data received over USB.
///
/// Data may contain one or more USB-MIDI Event Packets; their MIDI bytes go through the same framing as DIN input.
async fn process_usb_midi<'d, T: usb::Instance + 'd>(
    class: &mut MidiClass<'d, usb::Driver<'d, T>>,
    device: &'static DeviceAsyncMutex,
) -> Result<(), Disconnected> {
    let mut buf = [0; 64];
    let mut parser = Parser::new();
    loop {
        let n = class.read_packet(&mut buf).await?;
        for packet in buf[..n].chunks(4) {
            for byte in usb_midi_payload(packet) {
                if let Some(received) = parser.feed(*byte) {
                    deliver(received, device).await;
                }
            }
        }
    }
}
