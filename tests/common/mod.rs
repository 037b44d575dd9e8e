use std::fs::File;
use std::io::Error;
use std::path::Path;

/// Writes `members` members with `months` monthly dues of 10.00 each.
pub fn generate_dues(path: &Path, members: u32, months: u32) -> Result<(), Error> {
    let file = File::create(path)?;
    let mut wtr = csv::WriterBuilder::new().from_writer(file);
    wtr.write_record(["id", "member", "period", "amount_due", "amount_paid"])?;

    let mut id = 1;
    for member in 1..=members {
        for month in 0..months {
            let period = format!("{:04}-{:02}", 2020 + month / 12, month % 12 + 1);
            wtr.write_record([
                id.to_string(),
                member.to_string(),
                period,
                "10.00".to_string(),
                String::new(),
            ])?;
            id += 1;
        }
    }

    wtr.flush()?;
    Ok(())
}

/// Writes one payment of `amount` per member, `rounds` times over.
pub fn generate_payments(path: &Path, members: u32, rounds: u32, amount: &str) -> Result<(), Error> {
    let file = File::create(path)?;
    let mut wtr = csv::WriterBuilder::new().from_writer(file);
    wtr.write_record(["payment", "member", "amount", "method", "bank_account", "date", "notes"])?;

    let mut id = 1;
    for _ in 0..rounds {
        for member in 1..=members {
            wtr.write_record([
                id.to_string(),
                member.to_string(),
                amount.to_string(),
                "transfer".to_string(),
                (member % 3 + 1).to_string(),
                "2024-01-15".to_string(),
                String::new(),
            ])?;
            id += 1;
        }
    }

    wtr.flush()?;
    Ok(())
}
