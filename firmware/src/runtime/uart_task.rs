use embassy_futures::select::{Either, select};
use embassy_stm32 as hal;
use embassy_stm32::Peri;
use embassy_stm32::usart::{BufferedUart, Config as UartConfig, DataBits, Parity, StopBits};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::Timer;
use embedded_io_async::Read;
use sampler_core::boot_time::DEFAULT_BAUD_RATE;
use sampler_core::time::TickSource;

use crate::decoder::BootLineDecoder;
use crate::hw::EmbassyTicks;
use crate::link::{LinkRecord, RecordQueue, SerialControl, SerialControlSignal};

const UART_BUFFER_SIZE: usize = 128;

static mut UART_TX_BUFFER: [u8; UART_BUFFER_SIZE] = [0; UART_BUFFER_SIZE];
static mut UART_RX_BUFFER: [u8; UART_BUFFER_SIZE] = [0; UART_BUFFER_SIZE];

embassy_stm32::bind_interrupts!(struct UartIrqs {
    USART1 => embassy_stm32::usart::BufferedInterruptHandler<hal::peripherals::USART1>;
});

#[embassy_executor::task]
pub async fn run(
    records: &'static RecordQueue<CriticalSectionRawMutex>,
    serial: &'static SerialControlSignal<CriticalSectionRawMutex>,
    usart: Peri<'static, hal::peripherals::USART1>,
    tx_pin: Peri<'static, hal::peripherals::PA9>,
    rx_pin: Peri<'static, hal::peripherals::PA10>,
) -> ! {
    let mut config = UartConfig::default();
    config.baudrate = DEFAULT_BAUD_RATE;
    config.data_bits = DataBits::DataBits8;
    config.stop_bits = StopBits::STOP1;
    config.parity = Parity::ParityNone;

    let uart = unsafe {
        BufferedUart::new(
            usart,
            rx_pin,
            tx_pin,
            &mut UART_TX_BUFFER,
            &mut UART_RX_BUFFER,
            UartIrqs,
            config,
        )
        .expect("failed to initialize LRF UART")
    };
    let (_uart_tx, mut uart_rx) = uart.split();

    let mut decoder = BootLineDecoder::new();
    let mut listening = false;
    let mut ingress = [0u8; 32];

    loop {
        if !listening {
            listening = apply(serial.wait().await, &mut decoder);
            continue;
        }

        match select(serial.wait(), uart_rx.read(&mut ingress)).await {
            Either::First(control) => {
                listening = apply(control, &mut decoder);
            }
            Either::Second(Ok(count)) => {
                let now = EmbassyTicks.now_ms();
                for byte in &ingress[..count] {
                    if let Some(info) = decoder.push(*byte, now) {
                        records.send(LinkRecord::BootInfo(info)).await;
                    }
                }
            }
            Either::Second(Err(_)) => {
                defmt::warn!("uart: LRF read error");
                Timer::after_millis(5).await;
            }
        }
    }
}

/// Applies a serial control request and returns whether to keep listening.
fn apply(control: SerialControl, decoder: &mut BootLineDecoder) -> bool {
    decoder.reset();
    match control {
        SerialControl::Start { baud } => {
            if baud != DEFAULT_BAUD_RATE {
                defmt::warn!(
                    "uart: {=u32} baud requested, UART fixed at {=u32}",
                    baud,
                    DEFAULT_BAUD_RATE
                );
            }
            defmt::info!("uart: listening for LRF boot line");
            true
        }
        SerialControl::Stop => {
            defmt::info!("uart: stopped");
            false
        }
    }
}
