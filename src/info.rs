use std::error::Error;

use xc0424::schedule::ScheduleSlot;
use xc0424::types::{Mode, Reading};
use xc0424::Xc0424;

fn format_reading(reading: &Reading) -> String {
    format!(
        "{:.1}C  {:.1}F  {}%",
        reading.temperature,
        reading.fahrenheit(),
        reading.humidity
    )
}

/// Human readable interval: seconds below a minute, minutes otherwise
pub fn format_interval(secs: u16) -> String {
    if secs < 60 {
        format!("{secs} secs")
    } else {
        format!("{} mins", secs / 60)
    }
}

fn format_slot(slot: &ScheduleSlot) -> String {
    format!(
        "{} .. {}",
        slot.start.format("%Y-%m-%d %H:%M"),
        slot.end.format("%Y-%m-%d %H:%M")
    )
}

/// Print configuration, schedule, and live readings
pub fn apply_info(device: &mut Xc0424) -> Result<(), Box<dyn Error>> {
    let config = device.read_config()?;
    println!("device: {}", xc0424::INFO.name);
    println!("serial: {}", config.serial_id);
    println!("mode: {}", config.mode);
    println!(
        "lcd auto off: {}",
        if config.lcd_auto_off { "enabled" } else { "disabled" }
    );
    println!("time display: {}", config.time_format);
    println!("date display: {}", config.date_format);
    println!("temperature unit: {}", config.temperature_unit);
    println!("interval: {}", format_interval(config.sample_interval));
    println!("temperature offset: {:.1}", config.temperature_offset);
    println!("humidity offset: {}", config.humidity_offset);

    if config.mode == Mode::Segmented {
        let schedule = device.read_schedule()?;
        println!("segments:");
        for (i, slot) in schedule.slots.iter().enumerate() {
            match slot {
                Some(slot) => println!("  {}: {}", i + 1, format_slot(slot)),
                None => println!("  {}: unused", i + 1),
            }
        }
    }

    let current = device.read_current()?;
    let extremes = device.read_extremes()?;
    println!("current: {}", format_reading(&current));
    println!("minimum: {}", format_reading(&extremes.min));
    println!("maximum: {}", format_reading(&extremes.max));
    Ok(())
}
