#![allow(dead_code)]

use std::fs::File;
use std::io::Error;
use std::path::Path;

pub const HEADER: [&str; 4] = ["op", "owner", "amount", "account"];

/// Writes an operations CSV with the given rows after the header.
pub fn write_operations(path: &Path, rows: &[[&str; 4]]) -> Result<(), Error> {
    let file = File::create(path)?;
    let mut wtr = csv::WriterBuilder::new().from_writer(file);

    wtr.write_record(HEADER)?;
    for row in rows {
        wtr.write_record(row)?;
    }

    wtr.flush()?;
    Ok(())
}

/// Opens an account for `owner` followed by `deposits` deposits of 1.0 each.
pub fn generate_deposits(path: &Path, owner: &str, deposits: usize) -> Result<(), Error> {
    let file = File::create(path)?;
    let mut wtr = csv::WriterBuilder::new().from_writer(file);

    wtr.write_record(HEADER)?;
    wtr.write_record(["open", owner, "", ""])?;
    for _ in 0..deposits {
        wtr.write_record(["deposit", owner, "1.0", ""])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Opens `owners` accounts and then cycles transfers between neighbours until
/// the file reaches `size_kb` kilobytes.
pub fn generate_transfer_ring(path: &Path, owners: usize, size_kb: usize) -> Result<(), Error> {
    let file = File::create(path)?;
    let mut wtr = csv::WriterBuilder::new().from_writer(file);
    wtr.write_record(HEADER)?;

    let names: Vec<String> = (0..owners).map(|i| format!("user{i}@x.com")).collect();
    for name in &names {
        wtr.write_record(["open", name, "", ""])?;
        wtr.write_record(["deposit", name, "100", ""])?;
    }

    let target_size = (size_kb * 1024) as u64;
    let mut i = 0;
    // Check size every 1000 rows to avoid syscall overhead
    loop {
        for _ in 0..1000 {
            let from = &names[i % owners];
            let to = &names[(i + 1) % owners];
            wtr.write_record(["transfer", from, "1", to])?;
            i += 1;
        }
        wtr.flush()?;
        if std::fs::metadata(path)?.len() >= target_size {
            break;
        }
    }
    Ok(())
}
