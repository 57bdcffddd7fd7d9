use embassy_futures::select::{Either, select};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::Timer;
use sampler_core::events::SamplerEvent;
use sampler_core::led::{LedConfig, LedFeedback};
use sampler_core::time::TickSource;

use crate::hw::EmbassyTicks;
use crate::led::{EventQueue, PinIndicator};
use crate::status;

#[embassy_executor::task]
pub async fn run(
    indicator: PinIndicator<'static>,
    events: &'static EventQueue<CriticalSectionRawMutex>,
) -> ! {
    let ticks = EmbassyTicks;
    let mut led = LedFeedback::new(indicator, LedConfig::default());

    loop {
        let next = match led.remaining_ms(ticks.now_ms()) {
            Some(remaining) => {
                match select(events.receive(), Timer::after_millis(u64::from(remaining))).await {
                    Either::First(event) => Some(event),
                    Either::Second(()) => None,
                }
            }
            None => Some(events.receive().await),
        };

        let now = ticks.now_ms();
        match next {
            Some(event) => {
                log_event(event);
                status::record_event(event);
                led.on_event(event, now);
            }
            None => {
                led.service(now);
            }
        }
    }
}

fn log_event(event: SamplerEvent) {
    if event.is_failure() {
        defmt::warn!("event: {}", defmt::Display2Format(&event));
    } else {
        defmt::info!("event: {}", defmt::Display2Format(&event));
    }
}
