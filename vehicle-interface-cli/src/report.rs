//! Run reporting
//!
//! Collects what the interface sent during a scenario and prints either a
//! text summary or one JSON line per output frame.

use serde::Serialize;
use std::collections::BTreeMap;
use std::io::{self, Write};
use vehicle_interface::can::bitfield;
use vehicle_interface::{CanFrame, SignalDatabase, VehicleState};

/// One output frame as written in JSON-lines mode
#[derive(Debug, Serialize)]
pub struct FrameRecord<'a> {
    pub cycle: u64,
    pub time_s: f64,
    pub message: &'a str,
    pub address: u32,
    pub bus: u8,
    pub data: String,
}

/// Totals over a run
#[derive(Debug, Default, Serialize)]
pub struct RunSummary {
    pub cycles: u64,
    pub frames_per_message: BTreeMap<String, usize>,
    pub max_abs_steer: i64,
    pub button_presses: BTreeMap<i64, usize>,
    /// Cycles on which any bus link was invalid
    pub invalid_link_cycles: u64,
    pub final_velocity_estimate: f64,
}

pub struct Reporter {
    db: SignalDatabase,
    json: bool,
    summary: RunSummary,
}

fn hex(data: &[u8]) -> String {
    data.iter().map(|b| format!("{:02X}", b)).collect()
}

impl Reporter {
    pub fn new(db: SignalDatabase, json: bool) -> Self {
        Self {
            db,
            json,
            summary: RunSummary::default(),
        }
    }

    /// Account for one control cycle
    pub fn record_cycle(&mut self, cycle: u64, time_s: f64, state: &VehicleState, sent: &[CanFrame]) -> io::Result<()> {
        self.summary.cycles += 1;
        self.summary.final_velocity_estimate = state.velocity_estimate;
        if !(state.link.primary && state.link.camera) {
            self.summary.invalid_link_cycles += 1;
        }

        let stdout = io::stdout();
        let mut out = stdout.lock();
        for frame in sent {
            let message = self
                .db
                .get_message(frame.address)
                .map(|m| m.name.as_str())
                .unwrap_or("unknown");
            *self.summary.frames_per_message.entry(message.to_string()).or_default() += 1;

            if let Some(steer) = self.decode(frame, "ES_LKAS", &["LKAS_Output", "LKAS_Command"]) {
                self.summary.max_abs_steer = self.summary.max_abs_steer.max(steer.abs());
            }
            if let Some(button) = self.decode(frame, "ES_CruiseThrottle", &["Button"]) {
                if button != 0 {
                    *self.summary.button_presses.entry(button).or_default() += 1;
                }
            }

            if self.json {
                let record = FrameRecord {
                    cycle,
                    time_s,
                    message,
                    address: frame.address,
                    bus: frame.bus,
                    data: hex(&frame.data),
                };
                let line = serde_json::to_string(&record).map_err(io::Error::other)?;
                writeln!(out, "{}", line)?;
            }
        }
        Ok(())
    }

    /// Raw value of the first of `signals` present in `frame`, if it is `message`
    fn decode(&self, frame: &CanFrame, message: &str, signals: &[&str]) -> Option<i64> {
        let def = self.db.get_message(frame.address)?;
        if def.name != message {
            return None;
        }
        signals
            .iter()
            .find_map(|name| def.signal(name))
            .and_then(|signal| bitfield::extract(&frame.data, signal))
    }

    /// Print the text summary (skipped in JSON mode)
    pub fn print_summary(&self, variant: &str) {
        if self.json {
            return;
        }
        let s = &self.summary;
        println!("═══════════════════════════════════════════════");
        println!("  Vehicle Interface - Scenario Summary ({})", variant);
        println!("═══════════════════════════════════════════════\n");
        println!("  Cycles:              {}", s.cycles);
        println!("  Final v_ego:         {:.2} m/s", s.final_velocity_estimate);
        println!("  Max |steer|:         {}", s.max_abs_steer);
        println!("  Invalid link cycles: {}", s.invalid_link_cycles);

        println!("\nFrames sent:");
        for (message, count) in &s.frames_per_message {
            println!("  {:<20} {}", message, count);
        }

        if !s.button_presses.is_empty() {
            println!("\nButton presses:");
            for (code, count) in &s.button_presses {
                println!("  code {:<15} {}", code, count);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vehicle_interface::signals::parse_dbc_str;

    fn reporter() -> Reporter {
        let mut db = SignalDatabase::new();
        let dbc = include_str!("../../dbc/subaru_outback_2015_eyesight.dbc");
        for msg in parse_dbc_str(dbc, "inline").unwrap() {
            db.add_message(msg);
        }
        Reporter::new(db, false)
    }

    #[test]
    fn test_summary_counts_frames_and_presses() {
        let mut reporter = reporter();
        let state = VehicleState::default();

        // LKAS_Command -100 (13-bit two's complement), button 2 at bits 38..40
        let lkas = CanFrame::new(356, 0, vec![0x9C, 0x1F, 0, 0, 0, 0, 0, 0]);
        let throttle = CanFrame::new(544, 0, vec![0, 0, 0, 0, 0x80, 0, 0, 0]);
        reporter.record_cycle(0, 0.0, &state, &[lkas, throttle]).unwrap();

        let s = &reporter.summary;
        assert_eq!(s.cycles, 1);
        assert_eq!(s.max_abs_steer, 100);
        assert_eq!(s.frames_per_message.get("ES_LKAS"), Some(&1));
        assert_eq!(s.button_presses.get(&2), Some(&1));
        assert_eq!(s.invalid_link_cycles, 1);
    }

    #[test]
    fn test_hex_payload() {
        assert_eq!(hex(&[0x00, 0x1F, 0xAB]), "001FAB");
    }
}
