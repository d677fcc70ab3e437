//! CSV export for yearly results, search candidate tables and hourly captures.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::error::SizingResult;
use crate::search::CandidateRow;
use crate::sim::types::{HourlyCapture, SimulationResult};

/// Column header for the per-year table.
const YEARLY_HEADER: &str = "year,load_kwh,pv_generation_kwh,served_by_pv_kwh,\
                             served_by_battery_kwh,served_by_generator_kwh,fuel_hybrid_l,\
                             fuel_genonly_l,fuel_cost_hybrid,fuel_cost_genonly,fuel_savings,\
                             charging_losses_kwh,soc_end_kwh,generator_hours,load_hours,\
                             opex_pv_bess,opex_generator,gross_savings,discounted_savings";

/// Column header for the candidate table.
const CANDIDATE_HEADER: &str = "pv_kwp,bess_kwh,round,feasible,capex,npv,payback_year,rejection";

/// Column header for the hourly capture.
const CAPTURE_HEADER: &str = "hour,load,from_pv,from_battery,from_generator,soc,pv_generation";

fn create(path: &Path) -> SizingResult<io::BufWriter<File>> {
    Ok(io::BufWriter::new(File::create(path)?))
}

fn header(spec: &str) -> impl Iterator<Item = &str> {
    spec.split(',').map(str::trim)
}

fn opt(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.2}")).unwrap_or_default()
}

/// Exports the per-year table of a result to a CSV file.
///
/// # Errors
///
/// Returns an error if file creation or writing fails.
pub fn export_yearly_csv(result: &SimulationResult, path: &Path) -> SizingResult<()> {
    write_yearly_csv(result, create(path)?)
}

/// Writes one row per simulated year, in year order.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_yearly_csv(result: &SimulationResult, writer: impl Write) -> SizingResult<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(header(YEARLY_HEADER))?;

    for y in result.years.values() {
        wtr.write_record(&[
            y.year.to_string(),
            format!("{:.2}", y.load_kwh),
            format!("{:.2}", y.pv_generation_kwh),
            format!("{:.2}", y.served_by_pv_kwh),
            format!("{:.2}", y.served_by_battery_kwh),
            format!("{:.2}", y.served_by_generator_kwh),
            format!("{:.2}", y.fuel_hybrid_l),
            format!("{:.2}", y.fuel_genonly_l),
            format!("{:.2}", y.fuel_cost_hybrid),
            format!("{:.2}", y.fuel_cost_genonly),
            format!("{:.2}", y.fuel_savings),
            format!("{:.2}", y.charging_losses_kwh),
            format!("{:.2}", y.soc_end_kwh),
            y.generator_hours.to_string(),
            y.load_hours.to_string(),
            format!("{:.2}", y.opex_pv_bess),
            format!("{:.2}", y.opex_generator),
            format!("{:.2}", y.gross_savings),
            format!("{:.2}", y.discounted_savings),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Exports a search's candidate table to a CSV file.
///
/// # Errors
///
/// Returns an error if file creation or writing fails.
pub fn export_candidates_csv(rows: &[CandidateRow], path: &Path) -> SizingResult<()> {
    write_candidates_csv(rows, create(path)?)
}

/// Writes one row per evaluated candidate; absent values are empty cells.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_candidates_csv(rows: &[CandidateRow], writer: impl Write) -> SizingResult<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(header(CANDIDATE_HEADER))?;

    for r in rows {
        wtr.write_record(&[
            format!("{:.4}", r.pv_kwp),
            format!("{:.4}", r.bess_kwh),
            r.round.to_string(),
            r.feasible.to_string(),
            opt(r.capex),
            opt(r.npv),
            opt(r.payback_year),
            r.rejection.clone().unwrap_or_default(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Exports an hourly capture to a CSV file.
///
/// # Errors
///
/// Returns an error if file creation or writing fails.
pub fn export_capture_csv(capture: &HourlyCapture, path: &Path) -> SizingResult<()> {
    write_capture_csv(capture, create(path)?)
}

/// Writes the 24 captured hours, hour-of-day first.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_capture_csv(capture: &HourlyCapture, writer: impl Write) -> SizingResult<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(header(CAPTURE_HEADER))?;

    for h in 0..capture.len() {
        wtr.write_record(&[
            h.to_string(),
            format!("{:.4}", capture.load[h]),
            format!("{:.4}", capture.from_pv[h]),
            format!("{:.4}", capture.from_battery[h]),
            format!("{:.4}", capture.from_generator[h]),
            format!("{:.4}", capture.soc[h]),
            format!("{:.4}", capture.pv_generation[h]),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::types::YearlyAggregate;
    use std::collections::BTreeMap;

    fn result(years: u32) -> SimulationResult {
        SimulationResult {
            pv_kwp: 10.0,
            bess_kwh: 20.0,
            capex: 1000.0,
            feasible: true,
            npv: 12.5,
            payback_year: Some(3.25),
            years: (1..=years)
                .map(|y| {
                    (
                        y,
                        YearlyAggregate {
                            year: y,
                            load_kwh: 100.0,
                            generator_hours: 10,
                            ..YearlyAggregate::default()
                        },
                    )
                })
                .collect::<BTreeMap<_, _>>(),
            hourly_capture: None,
        }
    }

    fn to_string(buf: Vec<u8>) -> String {
        String::from_utf8(buf).unwrap_or_default()
    }

    #[test]
    fn yearly_header_and_rows() {
        let mut buf = Vec::new();
        write_yearly_csv(&result(3), &mut buf).unwrap();
        let out = to_string(buf);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("year,load_kwh,pv_generation_kwh"));
        assert_eq!(lines[0].split(',').count(), 19);
        assert!(lines[1].starts_with("1,100.00,"));
    }

    #[test]
    fn candidate_rows_leave_missing_values_empty() {
        let rows = vec![CandidateRow {
            pv_kwp: 5.0,
            bess_kwh: 0.0,
            round: 1,
            feasible: false,
            capex: None,
            npv: None,
            payback_year: None,
            rejection: Some("generator too small".to_string()),
        }];
        let mut buf = Vec::new();
        write_candidates_csv(&rows, &mut buf).unwrap();
        let out = to_string(buf);
        assert_eq!(
            out.lines().nth(1),
            Some("5.0000,0.0000,1,false,,,,generator too small")
        );
    }

    #[test]
    fn capture_has_one_row_per_hour() {
        let mut cap = HourlyCapture::new(1);
        for h in 0..24 {
            cap.load.push(h as f64);
            cap.from_pv.push(0.0);
            cap.from_battery.push(0.0);
            cap.from_generator.push(h as f64);
            cap.soc.push(0.0);
            cap.pv_generation.push(0.0);
        }
        let mut buf = Vec::new();
        write_capture_csv(&cap, &mut buf).unwrap();
        let out = to_string(buf);
        assert_eq!(out.lines().count(), 25);

        let mut rdr = csv::ReaderBuilder::new().from_reader(out.as_bytes());
        for record in rdr.records() {
            let rec = record.unwrap();
            for field in rec.iter() {
                assert!(field.parse::<f64>().is_ok());
            }
        }
    }

    #[test]
    fn deterministic_output() {
        let mut a = Vec::new();
        let mut b = Vec::new();
        write_yearly_csv(&result(2), &mut a).unwrap();
        write_yearly_csv(&result(2), &mut b).unwrap();
        assert_eq!(a, b);
    }
}
