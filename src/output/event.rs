use crate::scan::ScanResult;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio_modbus::FunctionCode;

/// Direction of a protocol message relative to this side of the connection.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Sent,
    Received,
}

impl Direction {
    pub fn arrow(&self) -> &'static str {
        match self {
            Self::Sent => "→",
            Self::Received => "←",
        }
    }
}

/// A single thing to report, rendered by either output format.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputEvent {
    Info(String),
    Success(String),
    Warning(String),
    Error(String),
    /// A raw protocol data unit as sent to or received from the device.
    Protocol {
        direction: Direction,
        function_code: Option<u8>,
        payload: Vec<u8>,
        timestamp: Option<DateTime<Utc>>,
    },
    /// Register contents, two big endian bytes per register.
    RegisterTable {
        start_address: u32,
        bytes: Vec<u8>,
        timestamp: Option<DateTime<Utc>>,
    },
    /// Coil or discrete input states, packed LSB first.
    CoilTable {
        start_address: u32,
        quantity: u32,
        bytes: Vec<u8>,
        timestamp: Option<DateTime<Utc>>,
    },
    ScanResults(Vec<ScanResult>),
}

impl OutputEvent {
    pub fn sent(function_code: Option<u8>, payload: &[u8]) -> Self {
        Self::Protocol {
            direction: Direction::Sent,
            function_code,
            payload: payload.to_vec(),
            timestamp: Some(Utc::now()),
        }
    }

    pub fn received(function_code: Option<u8>, payload: &[u8]) -> Self {
        Self::Protocol {
            direction: Direction::Received,
            function_code,
            payload: payload.to_vec(),
            timestamp: Some(Utc::now()),
        }
    }

    pub fn registers(start_address: u32, bytes: Vec<u8>) -> Self {
        Self::RegisterTable {
            start_address,
            bytes,
            timestamp: Some(Utc::now()),
        }
    }

    pub fn coils(start_address: u32, quantity: u32, bytes: Vec<u8>) -> Self {
        Self::CoilTable {
            start_address,
            quantity,
            bytes,
            timestamp: Some(Utc::now()),
        }
    }

    /// Events routed to the diagnostic stream.
    pub fn is_diagnostic(&self) -> bool {
        matches!(self, Self::Error(_) | Self::Warning(_))
    }

    /// Events dropped in quiet mode.
    pub fn is_chatter(&self) -> bool {
        matches!(self, Self::Info(_) | Self::Protocol { .. })
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Protocol { timestamp, .. }
            | Self::RegisterTable { timestamp, .. }
            | Self::CoilTable { timestamp, .. } => *timestamp,
            _ => None,
        }
    }
}

/// Display name of a Modbus function code.
pub fn function_name(code: u8) -> &'static str {
    match FunctionCode::new(code) {
        FunctionCode::ReadCoils => "Read Coils",
        FunctionCode::ReadDiscreteInputs => "Read Discrete Inputs",
        FunctionCode::ReadHoldingRegisters => "Read Holding Registers",
        FunctionCode::ReadInputRegisters => "Read Input Registers",
        FunctionCode::WriteSingleCoil => "Write Single Coil",
        FunctionCode::WriteSingleRegister => "Write Single Register",
        FunctionCode::WriteMultipleCoils => "Write Multiple Coils",
        FunctionCode::WriteMultipleRegisters => "Write Multiple Registers",
        FunctionCode::MaskWriteRegister => "Mask Write Register",
        FunctionCode::ReadWriteMultipleRegisters => "Read/Write Multiple Registers",
        _ => "Function",
    }
}
