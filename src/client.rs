//! Synchronous Modbus session over TCP or RTU.

use crate::config::{SerialSettings, SessionSettings};
use crate::endpoint::Endpoint;
use crate::error::{Error, Result};
use crate::output::{Output, OutputEvent};
use crate::scan::{ScanPlan, ScanResult, scan};
use crate::value::{pack_bits, unpack_bits};

use byteorder::{BigEndian, ByteOrder};
use log::{debug, trace};
use std::io::Write;
use std::net::{SocketAddr, ToSocketAddrs};
use tokio_modbus::FunctionCode;
use tokio_modbus::client::sync::{self, Context, Reader, Writer};
use tokio_modbus::prelude::Slave;

/// Connection info line for `endpoint`.
pub fn describe(endpoint: &Endpoint, unit_id: u8) -> String {
    match endpoint {
        Endpoint::Tcp { hostname, port } => {
            format!("Hostname: {hostname}:{port}, Unit ID: {unit_id}")
        }
        Endpoint::Rtu { serial_port } => {
            format!("Serial Port: {serial_port}, Unit ID: {unit_id}")
        }
    }
}

/// A single client request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    ReadCoils { address: u16, quantity: u16 },
    ReadDiscreteInputs { address: u16, quantity: u16 },
    ReadHoldingRegisters { address: u16, quantity: u16 },
    ReadInputRegisters { address: u16, quantity: u16 },
    WriteSingleCoil { address: u16, value: bool },
    WriteSingleRegister { address: u16, value: u16 },
    WriteMultipleCoils { address: u16, values: Vec<bool> },
    WriteMultipleRegisters { address: u16, values: Vec<u16> },
    MaskWriteRegister { address: u16, and_mask: u16, or_mask: u16 },
    /// Write `values` at `write_address`, then read `read_quantity` registers at `read_address`.
    ReadWriteMultipleRegisters {
        read_address: u16,
        read_quantity: u16,
        write_address: u16,
        values: Vec<u16>,
    },
}

fn put_u16(pdu: &mut Vec<u8>, value: u16) {
    pdu.extend_from_slice(&value.to_be_bytes());
}

fn put_words(pdu: &mut Vec<u8>, values: &[u16]) {
    put_u16(pdu, values.len() as u16);
    pdu.push((values.len() * 2) as u8);
    pdu.extend_from_slice(&registers_to_bytes(values));
}

impl Request {
    pub fn function_code(&self) -> FunctionCode {
        match self {
            Self::ReadCoils { .. } => FunctionCode::ReadCoils,
            Self::ReadDiscreteInputs { .. } => FunctionCode::ReadDiscreteInputs,
            Self::ReadHoldingRegisters { .. } => FunctionCode::ReadHoldingRegisters,
            Self::ReadInputRegisters { .. } => FunctionCode::ReadInputRegisters,
            Self::WriteSingleCoil { .. } => FunctionCode::WriteSingleCoil,
            Self::WriteSingleRegister { .. } => FunctionCode::WriteSingleRegister,
            Self::WriteMultipleCoils { .. } => FunctionCode::WriteMultipleCoils,
            Self::WriteMultipleRegisters { .. } => FunctionCode::WriteMultipleRegisters,
            Self::MaskWriteRegister { .. } => FunctionCode::MaskWriteRegister,
            Self::ReadWriteMultipleRegisters { .. } => FunctionCode::ReadWriteMultipleRegisters,
        }
    }

    /// Request PDU, function code first.
    pub fn pdu(&self) -> Vec<u8> {
        let mut pdu = vec![self.function_code().value()];
        match self {
            Self::ReadCoils { address, quantity }
            | Self::ReadDiscreteInputs { address, quantity }
            | Self::ReadHoldingRegisters { address, quantity }
            | Self::ReadInputRegisters { address, quantity } => {
                put_u16(&mut pdu, *address);
                put_u16(&mut pdu, *quantity);
            }
            Self::WriteSingleCoil { address, value } => {
                put_u16(&mut pdu, *address);
                put_u16(&mut pdu, if *value { 0xFF00 } else { 0x0000 });
            }
            Self::WriteSingleRegister { address, value } => {
                put_u16(&mut pdu, *address);
                put_u16(&mut pdu, *value);
            }
            Self::WriteMultipleCoils { address, values } => {
                let packed = pack_bits(values);
                put_u16(&mut pdu, *address);
                put_u16(&mut pdu, values.len() as u16);
                pdu.push(packed.len() as u8);
                pdu.extend_from_slice(&packed);
            }
            Self::WriteMultipleRegisters { address, values } => {
                put_u16(&mut pdu, *address);
                put_words(&mut pdu, values);
            }
            Self::MaskWriteRegister {
                address,
                and_mask,
                or_mask,
            } => {
                put_u16(&mut pdu, *address);
                put_u16(&mut pdu, *and_mask);
                put_u16(&mut pdu, *or_mask);
            }
            Self::ReadWriteMultipleRegisters {
                read_address,
                read_quantity,
                write_address,
                values,
            } => {
                put_u16(&mut pdu, *read_address);
                put_u16(&mut pdu, *read_quantity);
                put_u16(&mut pdu, *write_address);
                put_words(&mut pdu, values);
            }
        }
        pdu
    }

    /// Response PDU for a successful exchange. `data` are the bytes returned by [`Session::call`].
    pub fn response_pdu(&self, data: &[u8]) -> Vec<u8> {
        let mut pdu = vec![self.function_code().value()];
        match self {
            Self::ReadCoils { .. }
            | Self::ReadDiscreteInputs { .. }
            | Self::ReadHoldingRegisters { .. }
            | Self::ReadInputRegisters { .. }
            | Self::ReadWriteMultipleRegisters { .. } => {
                pdu.push(data.len() as u8);
                pdu.extend_from_slice(data);
            }
            Self::WriteMultipleCoils { address, values } => {
                put_u16(&mut pdu, *address);
                put_u16(&mut pdu, values.len() as u16);
            }
            Self::WriteMultipleRegisters { address, values } => {
                put_u16(&mut pdu, *address);
                put_u16(&mut pdu, values.len() as u16);
            }
            // single writes and mask writes echo the request
            Self::WriteSingleCoil { .. }
            | Self::WriteSingleRegister { .. }
            | Self::MaskWriteRegister { .. } => return self.pdu(),
        }
        pdu
    }

    /// The result event for a successful read, `None` for writes.
    pub fn result_event(&self, data: Vec<u8>) -> Option<OutputEvent> {
        match self {
            Self::ReadCoils { address, quantity } | Self::ReadDiscreteInputs { address, quantity } => {
                Some(OutputEvent::coils(*address as u32, *quantity as u32, data))
            }
            Self::ReadHoldingRegisters { address, .. }
            | Self::ReadInputRegisters { address, .. }
            | Self::ReadWriteMultipleRegisters {
                read_address: address,
                ..
            } => Some(OutputEvent::registers(*address as u32, data)),
            _ => None,
        }
    }
}

fn flatten<T>(res: tokio_modbus::Result<T>) -> Result<T> {
    match res {
        Ok(Ok(v)) => Ok(v),
        Ok(Err(exception)) => Err(Error::Protocol(exception.to_string())),
        Err(e) => Err(Error::Connection(e.to_string())),
    }
}

fn registers_to_bytes(words: &[u16]) -> Vec<u8> {
    let mut bytes = vec![0; words.len() * 2];
    BigEndian::write_u16_into(words, &mut bytes);
    bytes
}

fn to_u16(value: u32, what: &str) -> Result<u16> {
    u16::try_from(value)
        .map_err(|_| Error::validation(format!("{what} {value} is out of range (0-65535)")))
}

/// An open connection to one unit. The connection is closed on drop.
pub struct Session {
    endpoint: Endpoint,
    unit_id: u8,
    context: Context,
}

impl Session {
    pub fn connect(
        endpoint: &Endpoint,
        settings: &SessionSettings,
        serial: &SerialSettings,
    ) -> Result<Self> {
        let slave = Slave(settings.unit_id);
        let timeout = Some(settings.timeout());
        let context = match endpoint {
            Endpoint::Tcp { hostname, port } => {
                let addr = resolve(hostname, *port)?;
                debug!("Connecting to {addr} (unit {}).", settings.unit_id);
                sync::tcp::connect_slave_with_timeout(addr, slave, timeout)
            }
            Endpoint::Rtu { serial_port } => {
                let builder = serial.builder(serial_port, settings.timeout())?;
                debug!(
                    "Opening {serial_port} at {} baud (unit {}).",
                    serial.baud_rate, settings.unit_id
                );
                sync::rtu::connect_slave_with_timeout(&builder, slave, timeout)
            }
        }
        .map_err(|e| Error::Connection(format!("{endpoint}: {e}")))?;

        Ok(Self {
            endpoint: endpoint.clone(),
            unit_id: settings.unit_id,
            context,
        })
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn describe(&self) -> String {
        describe(&self.endpoint, self.unit_id)
    }

    /// Perform `request` and return its data: packed coils or big endian registers for reads,
    /// nothing for writes.
    pub fn call(&mut self, request: &Request) -> Result<Vec<u8>> {
        trace!("Request {:?}", request);
        match request {
            Request::ReadCoils { address, quantity } => {
                let bits = flatten(self.context.read_coils(*address, *quantity))?;
                Ok(pack_bits(&bits))
            }
            Request::ReadDiscreteInputs { address, quantity } => {
                let bits = flatten(self.context.read_discrete_inputs(*address, *quantity))?;
                Ok(pack_bits(&bits))
            }
            Request::ReadHoldingRegisters { address, quantity } => {
                let words = flatten(self.context.read_holding_registers(*address, *quantity))?;
                Ok(registers_to_bytes(&words))
            }
            Request::ReadInputRegisters { address, quantity } => {
                let words = flatten(self.context.read_input_registers(*address, *quantity))?;
                Ok(registers_to_bytes(&words))
            }
            Request::WriteSingleCoil { address, value } => {
                flatten(self.context.write_single_coil(*address, *value)).map(|_| vec![])
            }
            Request::WriteSingleRegister { address, value } => {
                flatten(self.context.write_single_register(*address, *value)).map(|_| vec![])
            }
            Request::WriteMultipleCoils { address, values } => {
                flatten(self.context.write_multiple_coils(*address, values)).map(|_| vec![])
            }
            Request::WriteMultipleRegisters { address, values } => {
                flatten(self.context.write_multiple_registers(*address, values)).map(|_| vec![])
            }
            Request::MaskWriteRegister {
                address,
                and_mask,
                or_mask,
            } => flatten(
                self.context
                    .masked_write_register(*address, *and_mask, *or_mask),
            )
            .map(|_| vec![]),
            Request::ReadWriteMultipleRegisters {
                read_address,
                read_quantity,
                write_address,
                values,
            } => {
                let words = flatten(self.context.read_write_multiple_registers(
                    *read_address,
                    *read_quantity,
                    *write_address,
                    values,
                ))?;
                Ok(registers_to_bytes(&words))
            }
        }
    }

    /// Perform `request`, reporting both PDUs and the resulting table on `output`.
    pub fn execute<O: Write, E: Write>(
        &mut self,
        output: &mut Output<O, E>,
        request: &Request,
    ) -> anyhow::Result<Vec<u8>> {
        let code = request.function_code().value();
        output.render(&OutputEvent::sent(Some(code), &request.pdu()))?;
        let data = self.call(request)?;
        output.render(&OutputEvent::received(Some(code), &request.response_pdu(&data)))?;
        if let Some(event) = request.result_event(data.clone()) {
            output.render(&event)?;
        }
        Ok(data)
    }

    pub fn read_coils(&mut self, address: u16, quantity: u16) -> Result<Vec<bool>> {
        let bytes = self.call(&Request::ReadCoils { address, quantity })?;
        Ok(unpack_bits(&bytes, quantity as usize))
    }

    pub fn read_discrete_inputs(&mut self, address: u16, quantity: u16) -> Result<Vec<bool>> {
        let bytes = self.call(&Request::ReadDiscreteInputs { address, quantity })?;
        Ok(unpack_bits(&bytes, quantity as usize))
    }

    pub fn read_holding_registers(&mut self, address: u16, quantity: u16) -> Result<Vec<u8>> {
        self.call(&Request::ReadHoldingRegisters { address, quantity })
    }

    pub fn read_input_registers(&mut self, address: u16, quantity: u16) -> Result<Vec<u8>> {
        self.call(&Request::ReadInputRegisters { address, quantity })
    }

    pub fn write_single_coil(&mut self, address: u16, value: bool) -> Result<()> {
        self.call(&Request::WriteSingleCoil { address, value })
            .map(|_| ())
    }

    pub fn write_single_register(&mut self, address: u16, value: u16) -> Result<()> {
        self.call(&Request::WriteSingleRegister { address, value })
            .map(|_| ())
    }

    pub fn write_multiple_coils(&mut self, address: u16, values: &[bool]) -> Result<()> {
        let values = values.to_vec();
        self.call(&Request::WriteMultipleCoils { address, values })
            .map(|_| ())
    }

    pub fn write_multiple_registers(&mut self, address: u16, values: &[u16]) -> Result<()> {
        let values = values.to_vec();
        self.call(&Request::WriteMultipleRegisters { address, values })
            .map(|_| ())
    }

    pub fn mask_write_register(&mut self, address: u16, and_mask: u16, or_mask: u16) -> Result<()> {
        self.call(&Request::MaskWriteRegister {
            address,
            and_mask,
            or_mask,
        })
        .map(|_| ())
    }

    /// Write `values` at `write_address`, then read big endian registers at `read_address`.
    pub fn read_write_multiple_registers(
        &mut self,
        read_address: u16,
        read_quantity: u16,
        write_address: u16,
        values: &[u16],
    ) -> Result<Vec<u8>> {
        self.call(&Request::ReadWriteMultipleRegisters {
            read_address,
            read_quantity,
            write_address,
            values: values.to_vec(),
        })
    }

    /// Holding register reader for [`scan`].
    pub fn reader(&mut self) -> impl FnMut(u32, u32) -> Result<Vec<u8>> + '_ {
        move |address, count| {
            let address = to_u16(address, "address")?;
            let quantity = to_u16(count, "quantity")?;
            self.read_holding_registers(address, quantity)
        }
    }

    pub fn scan(&mut self, plan: &ScanPlan) -> Result<Vec<ScanResult>> {
        scan(plan, self.reader())
    }
}

fn resolve(hostname: &str, port: u16) -> Result<SocketAddr> {
    (hostname, port)
        .to_socket_addrs()
        .map_err(|e| Error::Connection(format!("failed to resolve {hostname}: {e}")))?
        .next()
        .ok_or_else(|| Error::Connection(format!("no address found for {hostname}")))
}

#[cfg(test)]
mod tests {
    use super::{Request, Session, describe, registers_to_bytes, resolve, to_u16};
    use crate::config::{SerialSettings, SessionSettings};
    use crate::endpoint::Endpoint;
    use crate::error::Error;
    use crate::output::{Output, OutputEvent, OutputOptions};
    use crate::scan::ScanPlan;

    use std::future;
    use std::net::SocketAddr;
    use std::sync::{Arc, Mutex, mpsc};
    use tokio::net::TcpListener;
    use tokio_modbus::prelude::{ExceptionCode, Response, SlaveRequest};
    use tokio_modbus::server::tcp::{Server as TcpServer, accept_tcp_connection};

    const REGISTER_COUNT: u16 = 64;

    /// Holding registers `0..64`, each initialised to its own address.
    struct RegisterService {
        registers: Arc<Mutex<Vec<u16>>>,
    }

    impl RegisterService {
        fn read(&self, address: u16, quantity: u16) -> Result<Vec<u16>, ExceptionCode> {
            let start = address as usize;
            let registers = self.registers.lock().unwrap();
            registers
                .get(start..start + quantity as usize)
                .map(<[u16]>::to_vec)
                .ok_or(ExceptionCode::IllegalDataAddress)
        }

        fn write(&self, address: u16, values: &[u16]) -> Result<(), ExceptionCode> {
            let start = address as usize;
            let mut registers = self.registers.lock().unwrap();
            let slot = registers
                .get_mut(start..start + values.len())
                .ok_or(ExceptionCode::IllegalDataAddress)?;
            slot.copy_from_slice(values);
            Ok(())
        }
    }

    impl tokio_modbus::server::Service for RegisterService {
        type Request = SlaveRequest<'static>;
        type Exception = ExceptionCode;
        type Response = Response;
        type Future = future::Ready<Result<Response, ExceptionCode>>;

        fn call(&self, request: Self::Request) -> Self::Future {
            let res = match request.request {
                tokio_modbus::Request::ReadHoldingRegisters(address, quantity) => self
                    .read(address, quantity)
                    .map(Response::ReadHoldingRegisters),
                tokio_modbus::Request::WriteSingleRegister(address, value) => self
                    .write(address, &[value])
                    .map(|_| Response::WriteSingleRegister(address, value)),
                tokio_modbus::Request::ReadWriteMultipleRegisters(
                    read_address,
                    quantity,
                    write_address,
                    values,
                ) => self
                    .write(write_address, &values)
                    .and_then(|_| self.read(read_address, quantity))
                    .map(Response::ReadWriteMultipleRegisters),
                _ => Err(ExceptionCode::IllegalFunction),
            };
            future::ready(res)
        }
    }

    /// Serve a fresh [`RegisterService`] on a loopback port from a background thread.
    fn start_server() -> SocketAddr {
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            runtime.block_on(async move {
                let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
                tx.send(listener.local_addr().unwrap()).unwrap();

                let registers = Arc::new(Mutex::new((0..REGISTER_COUNT).collect::<Vec<u16>>()));
                let server = TcpServer::new(listener);
                let new_service = |_socket_addr| {
                    Ok(Some(RegisterService {
                        registers: registers.clone(),
                    }))
                };
                let on_connected = |stream, socket_addr| async move {
                    accept_tcp_connection(stream, socket_addr, new_service)
                };
                let on_process_error = |err| eprintln!("Server processing failed. [{err}]");
                let _ = server.serve(&on_connected, on_process_error).await;
            });
        });
        rx.recv().unwrap()
    }

    fn connect(addr: SocketAddr) -> Session {
        let endpoint = Endpoint::tcp(&addr.ip().to_string(), addr.port());
        Session::connect(
            &endpoint,
            &SessionSettings::default(),
            &SerialSettings::default(),
        )
        .unwrap()
    }

    fn json_output() -> Output<Vec<u8>, Vec<u8>> {
        Output::with_writers(OutputOptions::json(), Vec::new(), Vec::new())
    }

    fn records(bytes: Vec<u8>) -> Vec<serde_json::Value> {
        String::from_utf8(bytes)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn ut_describe() {
        assert_eq!(
            describe(&Endpoint::tcp("localhost", 502), 1),
            "Hostname: localhost:502, Unit ID: 1"
        );
        assert_eq!(
            describe(&Endpoint::rtu("/dev/ttyUSB0"), 17),
            "Serial Port: /dev/ttyUSB0, Unit ID: 17"
        );
    }

    #[test]
    fn ut_request_pdu_reads() {
        let request = Request::ReadHoldingRegisters {
            address: 0x0010,
            quantity: 2,
        };
        assert_eq!(request.pdu(), vec![0x03, 0x00, 0x10, 0x00, 0x02]);
        assert_eq!(
            request.response_pdu(&[0x12, 0x34, 0x56, 0x78]),
            vec![0x03, 0x04, 0x12, 0x34, 0x56, 0x78]
        );

        let request = Request::ReadCoils {
            address: 1,
            quantity: 10,
        };
        assert_eq!(request.pdu(), vec![0x01, 0x00, 0x01, 0x00, 0x0A]);
        assert_eq!(request.response_pdu(&[0xFF, 0x01]), vec![0x01, 0x02, 0xFF, 0x01]);
    }

    #[test]
    fn ut_request_pdu_writes() {
        let request = Request::WriteSingleCoil {
            address: 5,
            value: true,
        };
        assert_eq!(request.pdu(), vec![0x05, 0x00, 0x05, 0xFF, 0x00]);
        assert_eq!(request.response_pdu(&[]), request.pdu());

        let request = Request::WriteMultipleCoils {
            address: 0x13,
            values: vec![true, false, true, true, false, false, true, true, true, false],
        };
        assert_eq!(
            request.pdu(),
            vec![0x0F, 0x00, 0x13, 0x00, 0x0A, 0x02, 0xCD, 0x01]
        );
        assert_eq!(request.response_pdu(&[]), vec![0x0F, 0x00, 0x13, 0x00, 0x0A]);

        let request = Request::WriteMultipleRegisters {
            address: 1,
            values: vec![0x000A, 0x0102],
        };
        assert_eq!(
            request.pdu(),
            vec![0x10, 0x00, 0x01, 0x00, 0x02, 0x04, 0x00, 0x0A, 0x01, 0x02]
        );

        let request = Request::MaskWriteRegister {
            address: 4,
            and_mask: 0x00F2,
            or_mask: 0x0025,
        };
        assert_eq!(
            request.pdu(),
            vec![0x16, 0x00, 0x04, 0x00, 0xF2, 0x00, 0x25]
        );
    }

    #[test]
    fn ut_request_result_event() {
        let request = Request::ReadInputRegisters {
            address: 8,
            quantity: 1,
        };
        assert!(matches!(
            request.result_event(vec![0, 1]),
            Some(OutputEvent::RegisterTable { start_address: 8, .. })
        ));

        let request = Request::ReadDiscreteInputs {
            address: 3,
            quantity: 4,
        };
        assert!(matches!(
            request.result_event(vec![0x0F]),
            Some(OutputEvent::CoilTable {
                start_address: 3,
                quantity: 4,
                ..
            })
        ));

        let request = Request::WriteSingleRegister {
            address: 0,
            value: 1,
        };
        assert!(request.result_event(vec![]).is_none());
    }

    #[test]
    fn ut_registers_to_bytes() {
        assert_eq!(registers_to_bytes(&[0x0001, 0xABCD]), vec![0x00, 0x01, 0xAB, 0xCD]);
        assert!(registers_to_bytes(&[]).is_empty());
    }

    #[test]
    fn ut_to_u16() {
        assert_eq!(to_u16(65535, "address").unwrap(), 65535);
        assert!(to_u16(65536, "address").is_err());
    }

    #[test]
    fn ut_resolve_literal() {
        let addr = resolve("127.0.0.1", 1502).unwrap();
        assert_eq!(addr.port(), 1502);
        assert!(addr.ip().is_loopback());
        let addr = resolve("::1", 502).unwrap();
        assert!(addr.is_ipv6());
    }

    #[test]
    fn ut_request_read_write_multiple() {
        let request = Request::ReadWriteMultipleRegisters {
            read_address: 3,
            read_quantity: 6,
            write_address: 14,
            values: vec![0x00FF, 0x00FF, 0x00FF],
        };
        assert_eq!(
            request.pdu(),
            vec![
                0x17, 0x00, 0x03, 0x00, 0x06, 0x00, 0x0E, 0x00, 0x03, 0x06, 0x00, 0xFF, 0x00, 0xFF,
                0x00, 0xFF
            ]
        );
        assert_eq!(request.response_pdu(&[0x00, 0xFE]), vec![0x17, 0x02, 0x00, 0xFE]);
        assert!(matches!(
            request.result_event(vec![0x00, 0xFE]),
            Some(OutputEvent::RegisterTable { start_address: 3, .. })
        ));
    }

    #[test]
    fn ut_session_execute_read() {
        let mut session = connect(start_server());
        let mut output = json_output();
        let request = Request::ReadHoldingRegisters {
            address: 2,
            quantity: 3,
        };
        let data = session.execute(&mut output, &request).unwrap();
        assert_eq!(data, vec![0, 2, 0, 3, 0, 4]);

        let (out, err) = output.into_writers();
        assert!(err.is_empty());
        let records = records(out);
        let types: Vec<&str> = records.iter().map(|r| r["type"].as_str().unwrap()).collect();
        assert_eq!(types, vec!["protocol", "protocol", "register_table"]);
        assert_eq!(records[0]["direction"], "sent");
        assert_eq!(records[0]["pdu"], "0300020003");
        assert_eq!(records[1]["direction"], "received");
        assert_eq!(records[1]["pdu"], "0306000200030004");
        assert_eq!(records[2]["start_address"], 2);
        assert_eq!(records[2]["data"], serde_json::json!([0, 2, 0, 3, 0, 4]));
    }

    #[test]
    fn ut_session_execute_exception() {
        let mut session = connect(start_server());
        let mut output = json_output();
        let request = Request::ReadHoldingRegisters {
            address: 60,
            quantity: 8,
        };
        let err = session.execute(&mut output, &request).unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::Protocol(_))));

        // only the request was reported
        let (out, _) = output.into_writers();
        let records = records(out);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["direction"], "sent");
    }

    #[test]
    fn ut_session_read_write_multiple() {
        let mut session = connect(start_server());
        let data = session
            .read_write_multiple_registers(10, 3, 11, &[0xABCD])
            .unwrap();
        assert_eq!(data, vec![0x00, 0x0A, 0xAB, 0xCD, 0x00, 0x0C]);

        session.write_single_register(10, 0xFFFF).unwrap();
        assert_eq!(session.read_holding_registers(10, 1).unwrap(), vec![0xFF, 0xFF]);
        assert!(matches!(
            session.read_holding_registers(REGISTER_COUNT, 1),
            Err(Error::Protocol(_))
        ));
    }

    #[test]
    fn ut_session_scan() {
        let mut session = connect(start_server());
        let plan = ScanPlan::new(0, 20).window_size(4).step(2);
        let results = session.scan(&plan).unwrap();
        assert_eq!(results.len(), 20);
        assert_eq!(results[5].values, vec![[0, 5], [0, 5]]);
        assert!(results[5].overlapped());
        assert!(results.iter().all(|r| r.identical));

        // the window at 64 lies past the end of the register map
        let plan = ScanPlan::new(56, 70).window_size(4);
        assert!(matches!(session.scan(&plan), Err(Error::Protocol(_))));
    }

    #[test]
    fn ut_session_reader_range() {
        let mut session = connect(start_server());
        let mut read = session.reader();
        assert!(matches!(read(70_000, 1), Err(Error::Validation(_))));
        assert!(matches!(read(0, 70_000), Err(Error::Validation(_))));
        assert_eq!(read(1, 1).unwrap(), vec![0, 1]);
    }
}
