//! Newline delimited JSON records, one per event.
//!
//! Field order is part of the format: `timestamp`, `iteration` (only while polling), `type`,
//! then the fields of the event type.

use crate::output::event::{Direction, OutputEvent};
use crate::scan::ScanResult;
use crate::value::unpack_bits;

use chrono::{SecondsFormat, Utc};
use itertools::Itertools;
use serde::Serialize;
use std::io::{self, Write};

#[derive(Serialize)]
struct Record<'a> {
    timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    iteration: Option<u32>,
    #[serde(flatten)]
    body: Body<'a>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Body<'a> {
    Info {
        message: &'a str,
    },
    Success {
        message: &'a str,
    },
    Warning {
        message: &'a str,
    },
    Error {
        message: &'a str,
    },
    Protocol {
        direction: Direction,
        #[serde(skip_serializing_if = "Option::is_none")]
        function_code: Option<u8>,
        pdu: String,
    },
    RegisterTable {
        start_address: u32,
        quantity: usize,
        data: &'a [u8],
    },
    CoilTable {
        start_address: u32,
        quantity: u32,
        data: Vec<bool>,
    },
    ScanResults {
        results: &'a [ScanResult],
    },
}

impl<'a> Body<'a> {
    fn from_event(event: &'a OutputEvent) -> Self {
        match event {
            OutputEvent::Info(message) => Self::Info { message },
            OutputEvent::Success(message) => Self::Success { message },
            OutputEvent::Warning(message) => Self::Warning { message },
            OutputEvent::Error(message) => Self::Error { message },
            OutputEvent::Protocol {
                direction,
                function_code,
                payload,
                ..
            } => Self::Protocol {
                direction: *direction,
                function_code: *function_code,
                pdu: payload.iter().map(|b| format!("{b:02X}")).join(""),
            },
            OutputEvent::RegisterTable {
                start_address,
                bytes,
                ..
            } => Self::RegisterTable {
                start_address: *start_address,
                quantity: bytes.len() / 2,
                data: bytes,
            },
            OutputEvent::CoilTable {
                start_address,
                quantity,
                bytes,
                ..
            } => Self::CoilTable {
                start_address: *start_address,
                quantity: *quantity,
                data: unpack_bits(bytes, *quantity as usize),
            },
            OutputEvent::ScanResults(results) => Self::ScanResults { results },
        }
    }
}

#[derive(Debug, Default)]
pub struct JsonRenderer {
    iteration: Option<u32>,
}

impl JsonRenderer {
    pub fn set_iteration(&mut self, iteration: Option<u32>) {
        self.iteration = iteration;
    }

    pub fn render(&self, out: &mut dyn Write, event: &OutputEvent) -> io::Result<()> {
        if let OutputEvent::ScanResults(results) = event {
            if results.is_empty() {
                return Ok(());
            }
        }

        let record = Record {
            timestamp: event
                .timestamp()
                .unwrap_or_else(Utc::now)
                .to_rfc3339_opts(SecondsFormat::AutoSi, true),
            iteration: self.iteration,
            body: Body::from_event(event),
        };
        serde_json::to_writer(&mut *out, &record)?;
        writeln!(out)
    }
}
