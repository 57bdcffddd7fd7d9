use embassy_futures::select::{Either3, select3};
use embassy_stm32::exti::ExtiInput;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::{Delay, Timer};
use sampler_core::time::TickSource;

use super::{Sequencer, Tester};
use crate::hw::EmbassyTicks;
use crate::link::{FirmwareLink, LinkRecord, RecordQueue, SerialControlSignal};

/// How often the tester checks its optional response timeout.
const POLL_INTERVAL_MS: u64 = 100;

#[embassy_executor::task]
pub async fn run(
    tester: &'static Tester,
    mut power: Sequencer,
    mut ok_button: ExtiInput<'static>,
    records: &'static RecordQueue<CriticalSectionRawMutex>,
    serial: &'static SerialControlSignal<CriticalSectionRawMutex>,
) -> ! {
    let mut link = FirmwareLink::new(serial);
    let mut delay = Delay;

    defmt::info!("boot-test: enter, power cycling LRF");
    tester.enter(&mut link, &mut power, &mut delay);

    loop {
        match select3(
            ok_button.wait_for_falling_edge(),
            records.receive(),
            Timer::after_millis(POLL_INTERVAL_MS),
        )
        .await
        {
            Either3::First(()) => {
                defmt::info!("boot-test: OK pressed, power cycling LRF");
                tester.retrigger(&mut power, &mut delay);
            }
            Either3::Second(record) => {
                if !link.dispatch(&record) {
                    log_unhandled(&record);
                }
            }
            Either3::Third(()) => {
                tester.poll(EmbassyTicks.now_ms());
            }
        }
    }
}

fn log_unhandled(record: &LinkRecord) {
    match record {
        LinkRecord::Identification(ident) => {
            defmt::warn!("link: unhandled identification serial={}", ident.serial.as_str());
        }
        LinkRecord::BootInfo(info) => {
            defmt::warn!("link: unhandled boot info id={}", info.id.as_str());
        }
    }
}
