use std::error::Error;

use bpaf::Bpaf;
use chrono::Local;
use tracing::warn;
use xc0424::schedule::{ScheduleSlot, SegmentedSchedule, SLOT_COUNT};
use xc0424::types::{DateFormat, Mode, TemperatureUnit, TimeFormat};
use xc0424::Xc0424;

use crate::info::format_interval;

/// Settings to change. Anything left out keeps its current value.
#[derive(Clone, Debug, Bpaf)]
pub struct SetArgs {
    /// Recording mode [acyclic|cyclic|segmented]
    #[bpaf(short, long, argument("MODE"))]
    pub mode: Option<Mode>,
    /// Turn the display off when idle [true|false]
    #[bpaf(long("lcd-auto-off"), argument("BOOL"))]
    pub lcd_auto_off: Option<bool>,
    /// Clock display [12|24]
    #[bpaf(long, argument("12|24"))]
    pub clock: Option<TimeFormat>,
    /// Date display order [dm|md]
    #[bpaf(long, argument("dm|md"))]
    pub date: Option<DateFormat>,
    /// Temperature display unit [c|f]
    #[bpaf(short, long, argument("c|f"))]
    pub unit: Option<TemperatureUnit>,
    /// Sample interval: 8s to 56s in 8s steps, or 1m to 240m in whole minutes
    #[bpaf(short, long, argument("DURATION"))]
    pub interval: Option<humantime::Duration>,
    /// Temperature calibration in celsius, -10.0 to 10.0 (use --temperature-offset=-1.5)
    #[bpaf(long, argument("CELSIUS"))]
    pub temperature_offset: Option<f32>,
    /// Humidity calibration in percent, -20 to 20
    #[bpaf(long, argument("PERCENT"))]
    pub humidity_offset: Option<i16>,
    /// Segmented recording window, repeat up to four times
    #[bpaf(
        long("slot"),
        argument("START..END"),
        many,
        guard(|s| s.len() <= SLOT_COUNT, "at most four slots are supported")
    )]
    pub slots: Vec<ScheduleSlot>,
}

/// Read the current configuration, merge the requested changes, and write it back
pub fn apply_settings(device: &mut Xc0424, args: &SetArgs) -> Result<(), Box<dyn Error>> {
    let mut config = device.read_config()?;

    if let Some(mode) = args.mode {
        config.mode = mode;
    }
    if let Some(enabled) = args.lcd_auto_off {
        config.lcd_auto_off = enabled;
    }
    if let Some(format) = args.clock {
        config.time_format = format;
    }
    if let Some(format) = args.date {
        config.date_format = format;
    }
    if let Some(unit) = args.unit {
        config.temperature_unit = unit;
    }
    if let Some(interval) = args.interval {
        config.sample_interval = interval.as_secs().min(u16::MAX as u64) as u16;
    }
    if let Some(offset) = args.temperature_offset {
        config.temperature_offset = offset;
    }
    if let Some(offset) = args.humidity_offset {
        config.humidity_offset = offset;
    }

    let schedule = if args.slots.is_empty() {
        None
    } else {
        if config.mode != Mode::Segmented {
            warn!("slots only take effect in segmented mode, ignoring");
        }
        Some(SegmentedSchedule::new(&args.slots)?)
    };

    let now = Local::now().naive_local();
    let write = device.apply(&config, schedule.as_ref(), now)?;
    println!(
        "updated configuration: {} mode, interval {}",
        config.mode,
        format_interval(write.interval)
    );
    if config.mode == Mode::Segmented {
        println!("wrote schedule and cleared stored history");
    }
    Ok(())
}
