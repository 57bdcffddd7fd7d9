use cortex_m::interrupt;
use cortex_m::register::primask;
use critical_section::{self, RawRestoreState};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_stm32 as hal;
use embassy_stm32::exti::ExtiInput;
use embassy_stm32::gpio::{Flex, Level, Output, Pull, Speed};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use embassy_time::Delay;
use sampler_core::boot_time::{BootTestConfig, BootTimeModel, BootTimeTester};
use sampler_core::power::PowerSequencer;
use static_cell::StaticCell;

use crate::hw::EmbassyTicks;
use crate::hw::power::{FlexPowerLine, Rail};
use crate::led::{ChannelEventSink, EventQueue, PinIndicator};
use crate::link::{RecordQueue, SerialControlSignal};
use crate::model::SharedModel;

mod boot_task;
mod led_task;
mod render_task;
mod uart_task;

critical_section::set_impl!(InterruptCriticalSection);

struct InterruptCriticalSection;

unsafe impl critical_section::Impl for InterruptCriticalSection {
    unsafe fn acquire() -> RawRestoreState {
        let primask = primask::read();
        interrupt::disable();
        primask.is_active()
    }

    unsafe fn release(restore_state: RawRestoreState) {
        if restore_state {
            unsafe {
                interrupt::enable();
            }
        }
    }
}

pub(super) type BootModel = SharedModel<CriticalSectionRawMutex, BootTimeModel>;
pub(super) type Tester = BootTimeTester<
    &'static BootModel,
    EmbassyTicks,
    ChannelEventSink<'static, CriticalSectionRawMutex>,
>;
pub(super) type Sequencer = PowerSequencer<FlexPowerLine<'static>, Rail, EmbassyTicks, Delay>;

pub(super) static EVENT_QUEUE: EventQueue<CriticalSectionRawMutex> = Channel::new();
pub(super) static RECORD_QUEUE: RecordQueue<CriticalSectionRawMutex> = Channel::new();
pub(super) static SERIAL_CONTROL: SerialControlSignal<CriticalSectionRawMutex> = Signal::new();

static BOOT_MODEL: StaticCell<BootModel> = StaticCell::new();
static TESTER: StaticCell<Tester> = StaticCell::new();

#[embassy_executor::main]
pub async fn main(spawner: Spawner) {
    let p = hal::init(hal::Config::default());

    let line = FlexPowerLine::new(Flex::new(p.PC6));
    #[cfg(feature = "aux-rail")]
    let rail = crate::hw::power::LoadSwitchRail::new(
        Output::new(p.PC10, Level::Low, Speed::Low),
        embassy_stm32::gpio::Input::new(p.PC12, Pull::Down),
    );
    #[cfg(not(feature = "aux-rail"))]
    let rail = sampler_core::power::NoAuxRail::new();
    let power: Sequencer = PowerSequencer::new(line, rail, EmbassyTicks, Delay);

    let model: &'static BootModel = BOOT_MODEL.init(SharedModel::new(BootTimeModel::default()));
    let tester: &'static Tester = TESTER.init(BootTimeTester::new(
        model,
        EmbassyTicks,
        ChannelEventSink::new(&EVENT_QUEUE),
        BootTestConfig::default(),
    ));

    let indicator = PinIndicator::new(
        Output::new(p.PB1, Level::Low, Speed::Low),
        Output::new(p.PB0, Level::Low, Speed::Low),
        Output::new(p.PB5, Level::Low, Speed::Low),
    );
    let ok_button = ExtiInput::new(p.PC4, p.EXTI4, Pull::Up);

    spawner
        .spawn(led_task::run(indicator, &EVENT_QUEUE))
        .expect("failed to spawn LED task");

    spawner
        .spawn(render_task::run(model))
        .expect("failed to spawn render task");

    spawner
        .spawn(uart_task::run(
            &RECORD_QUEUE,
            &SERIAL_CONTROL,
            p.USART1,
            p.PA9,
            p.PA10,
        ))
        .expect("failed to spawn UART task");

    spawner
        .spawn(boot_task::run(
            tester,
            power,
            ok_button,
            &RECORD_QUEUE,
            &SERIAL_CONTROL,
        ))
        .expect("failed to spawn boot-test task");

    core::future::pending::<()>().await;
}
