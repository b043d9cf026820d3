//! Aligned, optionally colored tables and messages for terminals.

use crate::output::event::{Direction, OutputEvent, function_name};
use crate::scan::ScanResult;
use crate::value::unpack_bits;

use chrono::{DateTime, Local, Utc};
use crossterm::style::{Color, Stylize, style};
use itertools::Itertools;
use std::io::{self, Write};

const BYTES_PER_ROW: usize = 16;
const BITS_PER_ROW: usize = 8;
const ADDRESSES_PER_ROW: u32 = 8;
const SCAN_RULE_WIDTH: usize = 55;

#[derive(Debug)]
pub struct TableRenderer {
    colors: bool,
    iteration: Option<u32>,
}

impl TableRenderer {
    pub fn new(colors: bool) -> Self {
        Self {
            colors,
            iteration: None,
        }
    }

    pub fn set_iteration(&mut self, iteration: Option<u32>) {
        self.iteration = iteration;
    }

    fn paint(&self, text: &str, color: Color) -> String {
        if self.colors {
            style(text).with(color).to_string()
        } else {
            text.to_owned()
        }
    }

    fn prefix(&self, timestamp: Option<DateTime<Utc>>) -> String {
        match self.iteration {
            Some(n) => {
                let time = timestamp
                    .map(|t| t.with_timezone(&Local))
                    .unwrap_or_else(Local::now);
                format!("[{}] [{n}] ", time.format("%Y-%m-%d %H:%M:%S%.3f"))
            }
            None => String::new(),
        }
    }

    pub fn render(&self, out: &mut dyn Write, event: &OutputEvent) -> io::Result<()> {
        match event {
            OutputEvent::Info(msg) => self.message(out, msg, Color::Blue),
            OutputEvent::Success(msg) => self.message(out, msg, Color::Green),
            OutputEvent::Warning(msg) => self.message(out, msg, Color::Yellow),
            OutputEvent::Error(msg) => self.message(out, msg, Color::Red),
            OutputEvent::Protocol {
                direction,
                function_code,
                payload,
                timestamp,
            } => {
                let code = function_code.or_else(|| payload.first().copied());
                let name = match code {
                    Some(code) => format!("{} (0x{code:02X})", function_name(code)),
                    None => "Unknown".to_owned(),
                };
                let hex = payload.iter().map(|b| format!("{b:02X}")).join(" ");
                let line = format!(
                    "{}{} {name} [{hex}]",
                    self.prefix(*timestamp),
                    direction.arrow()
                );
                let color = match direction {
                    Direction::Sent => Color::Cyan,
                    Direction::Received => Color::Green,
                };
                writeln!(out, "{}", self.paint(&line, color))
            }
            OutputEvent::RegisterTable {
                start_address,
                bytes,
                ..
            } => self.registers(out, *start_address, bytes),
            OutputEvent::CoilTable {
                start_address,
                quantity,
                bytes,
                ..
            } => self.coils(out, *start_address, *quantity, bytes),
            OutputEvent::ScanResults(results) => self.scan_results(out, results),
        }
    }

    fn message(&self, out: &mut dyn Write, msg: &str, color: Color) -> io::Result<()> {
        let line = format!("{}{msg}", self.prefix(None));
        writeln!(out, "{}", self.paint(&line, color))
    }

    fn registers(&self, out: &mut dyn Write, start_address: u32, bytes: &[u8]) -> io::Result<()> {
        let header = format!("{:<8}\t{}\n", "Offset (hex)", "Bytes (hex)");
        write!(out, "{}", self.paint(&header, Color::Blue))?;
        writeln!(out, "{}", self.paint(&"-".repeat(header.len()), Color::Blue))?;

        if bytes.is_empty() {
            return Ok(());
        }

        let first = start_address as usize * 2;
        let last = first + bytes.len() - 1;
        for row in (first / BYTES_PER_ROW * BYTES_PER_ROW..=last).step_by(BYTES_PER_ROW) {
            let mut line = self.paint(&format!("{row:08X}"), Color::Cyan);
            line.push('\t');
            for offset in row..row + BYTES_PER_ROW {
                if (first..=last).contains(&offset) {
                    let cell = format!("{:02X} ", bytes[offset - first]);
                    line.push_str(&self.paint(&cell, Color::Green));
                } else {
                    line.push_str(&self.paint(".. ", Color::DarkGrey));
                }
            }
            writeln!(out, "{line}")?;
        }
        Ok(())
    }

    fn coils(
        &self,
        out: &mut dyn Write,
        start_address: u32,
        quantity: u32,
        bytes: &[u8],
    ) -> io::Result<()> {
        let header = format!("{:<10} {}\n", "Address", "Bits");
        write!(out, "{}", self.paint(&header, Color::Blue))?;
        let rule = format!("{} {}", "-".repeat(10), "-".repeat(15));
        writeln!(out, "{}", self.paint(&rule, Color::Blue))?;

        if quantity == 0 {
            return Ok(());
        }

        let bits = unpack_bits(bytes, quantity as usize);
        let first = start_address as usize;
        let last = first + bits.len() - 1;
        for row in (first / BITS_PER_ROW * BITS_PER_ROW..=last).step_by(BITS_PER_ROW) {
            let mut line = self.paint(&format!("0x{row:04X}     "), Color::Cyan);
            for address in row..row + BITS_PER_ROW {
                if (first..=last).contains(&address) {
                    let cell = match bits[address - first] {
                        true => self.paint("1 ", Color::Green),
                        false => self.paint("0 ", Color::Yellow),
                    };
                    line.push_str(&cell);
                } else {
                    line.push_str(&self.paint(". ", Color::DarkGrey));
                }
            }
            writeln!(out, "{line}")?;
        }
        Ok(())
    }

    fn scan_results(&self, out: &mut dyn Write, results: &[ScanResult]) -> io::Result<()> {
        let observed: Vec<&ScanResult> = results
            .iter()
            .filter(|r| !r.values.is_empty())
            .sorted_by_key(|r| r.address)
            .collect();
        if observed.is_empty() {
            return Ok(());
        }

        let header = format!("{:<8}\t{}\n", "Address", "Values (hex, 2 bytes each)");
        write!(out, "{}", self.paint(&header, Color::Blue))?;
        writeln!(out, "{}", self.paint(&"-".repeat(SCAN_RULE_WIDTH), Color::Blue))?;

        for (row, chunk) in &observed
            .into_iter()
            .chunk_by(|r| r.address / ADDRESSES_PER_ROW * ADDRESSES_PER_ROW)
        {
            let chunk: Vec<&ScanResult> = chunk.collect();
            let mut line = self.paint(&format!("{row:04X}    "), Color::Cyan);
            line.push('\t');
            for address in row..row.saturating_add(ADDRESSES_PER_ROW) {
                match chunk.iter().find(|r| r.address == address) {
                    Some(result) => line.push_str(&self.scan_cell(result)),
                    None => line.push_str(&self.paint("....  ", Color::DarkGrey)),
                }
            }
            writeln!(out, "{line}")?;
        }
        Ok(())
    }

    fn scan_cell(&self, result: &ScanResult) -> String {
        let [hi, lo] = result.values[0];
        let (marker, color) = if !result.overlapped() {
            (' ', Color::Green)
        } else if result.identical {
            ('=', Color::Yellow)
        } else {
            ('!', Color::Red)
        };
        self.paint(&format!("{hi:02X}{lo:02X}{marker} "), color)
    }
}
