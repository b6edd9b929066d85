//! RTU packager
//!
//! Wraps a PDU into an RTU ADU (unit id + CRC-16/MODBUS) and back.

use crate::error::{Result, TransportError};
use crate::frame::{self, RTU_MAX_SIZE, RTU_MIN_SIZE};
use crc::{Crc, CRC_16_MODBUS};

/// CRC calculator for RTU
const CRC_MODBUS: Crc<u16> = Crc::<u16>::new(&CRC_16_MODBUS);

/// Modbus protocol data unit: function code + data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pdu {
    pub function: u8,
    pub data: Vec<u8>,
}

impl Pdu {
    pub fn new(function: u8, data: impl Into<Vec<u8>>) -> Self {
        Self {
            function,
            data: data.into(),
        }
    }

    /// Check if this PDU is an exception reply
    pub fn is_exception(&self) -> bool {
        self.function & frame::EXCEPTION_FLAG != 0
    }
}

/// Frame encoding seam between PDUs and wire ADUs
pub trait Packager {
    /// Build a request ADU
    fn encode(&self, pdu: &Pdu) -> Result<Vec<u8>>;

    /// Extract the PDU from a response ADU
    fn decode(&self, adu: &[u8]) -> Result<Pdu>;

    /// Check that a response belongs to its request
    fn verify(&self, request: &[u8], response: &[u8]) -> Result<()>;
}

/// Compute CRC-16/MODBUS over `data`
pub fn crc16(data: &[u8]) -> u16 {
    CRC_MODBUS.checksum(data)
}

/// RTU packager bound to one slave
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RtuPackager {
    pub slave_id: u8,
}

impl Default for RtuPackager {
    fn default() -> Self {
        Self { slave_id: 1 }
    }
}

impl RtuPackager {
    pub fn new(slave_id: u8) -> Self {
        Self { slave_id }
    }

    /// Expected response length for a request ADU
    pub fn response_length(&self, request: &[u8]) -> usize {
        frame::calculate_response_length(request)
    }
}

impl Packager for RtuPackager {
    fn encode(&self, pdu: &Pdu) -> Result<Vec<u8>> {
        let length = pdu.data.len() + RTU_MIN_SIZE;
        if length > RTU_MAX_SIZE {
            return Err(TransportError::FrameTooLarge {
                length,
                max: RTU_MAX_SIZE,
            });
        }

        let mut adu = Vec::with_capacity(length);
        adu.push(self.slave_id);
        adu.push(pdu.function);
        adu.extend_from_slice(&pdu.data);
        // CRC is little-endian on the wire
        let checksum = crc16(&adu);
        adu.extend_from_slice(&checksum.to_le_bytes());
        Ok(adu)
    }

    fn decode(&self, adu: &[u8]) -> Result<Pdu> {
        let length = adu.len();
        if length < RTU_MIN_SIZE {
            return Err(TransportError::InvalidResponse(format!(
                "response length {} does not meet minimum {}",
                length, RTU_MIN_SIZE
            )));
        }

        let expected = crc16(&adu[..length - 2]);
        let actual = u16::from_le_bytes([adu[length - 2], adu[length - 1]]);
        if expected != actual {
            return Err(TransportError::CrcMismatch { expected, actual });
        }

        Ok(Pdu {
            function: adu[1],
            data: adu[2..length - 2].to_vec(),
        })
    }

    fn verify(&self, request: &[u8], response: &[u8]) -> Result<()> {
        if response.len() < RTU_MIN_SIZE {
            return Err(TransportError::InvalidResponse(format!(
                "response length {} does not meet minimum {}",
                response.len(),
                RTU_MIN_SIZE
            )));
        }
        let Some(&request_slave) = request.first() else {
            return Err(TransportError::InvalidRequest("empty request".to_string()));
        };
        if response[0] != request_slave {
            return Err(TransportError::SlaveMismatch {
                request: request_slave,
                response: response[0],
            });
        }
        Ok(())
    }
}
