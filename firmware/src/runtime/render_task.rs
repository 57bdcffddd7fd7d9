use super::BootModel;
use crate::status;
use sampler_core::model::ModelCell;

/// Logs the boot-time screen whenever its model asks for a redraw.
#[embassy_executor::task]
pub async fn run(model: &'static BootModel) -> ! {
    loop {
        model.changed().await;
        let screen = model.snapshot();

        match screen.displayed_boot_time() {
            Some(boot_time_ms) => {
                defmt::info!("boot-test: {} {=u32} ms", screen.state.label(), boot_time_ms);
            }
            None => defmt::info!("boot-test: {}", screen.state.label()),
        }

        if let Some(info) = &screen.boot_info {
            defmt::info!(
                "boot-test: ID {} F/W {}",
                info.id.as_str(),
                info.firmware.as_str()
            );
        }

        for line in screen.status.iter() {
            defmt::info!("boot-test: {}", line);
        }

        let health = status::snapshot();
        defmt::debug!(
            "status: power={} last_transition={} last_boot_time={} rail_failures={} dropped_events={} dropped_commands={} unhandled={}",
            health.power_on,
            health.last_power_transition_ms,
            health.last_boot_time_ms,
            health.rail_failures,
            health.dropped_events,
            health.dropped_commands,
            health.unhandled_records
        );
    }
}
