use std::error::Error;
use std::io::{stdout, Write};

use tracing::info;
use xc0424::history::SampleRecord;
use xc0424::Xc0424;

pub const HEADER: &str = "YYYY-MM-DDTHH:MM:SS,HUM_%,TEMP_C,TEMP_F";

pub fn format_record(record: &SampleRecord) -> String {
    format!(
        "{},{},{:.1},{:.1}",
        record.timestamp.format("%Y-%m-%dT%H:%M:%S"),
        record.humidity,
        record.temperature,
        record.fahrenheit()
    )
}

/// Stream every stored reading to stdout as it is downloaded
pub fn apply_history(device: &mut Xc0424) -> Result<(), Box<dyn Error>> {
    let mut out = stdout().lock();
    writeln!(out, "{HEADER}")?;
    let mut count = 0usize;
    for record in device.history() {
        writeln!(out, "{}", format_record(&record?))?;
        count += 1;
    }
    out.flush()?;
    info!("downloaded {count} readings");
    Ok(())
}
