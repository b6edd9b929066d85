//! RTU frame sizes and response length prediction
//!
//! An RTU ADU is `[Unit ID(1)][Function(1)][Data(N)][CRC(2)]`. Over TCP there
//! are no inter-frame gaps, so the expected response size has to be derived
//! from the request itself.

// ============================================================================
// Frame Size Constants
// ============================================================================

/// Smallest RTU frame: Unit ID(1) + Function(1) + CRC(2)
pub const RTU_MIN_SIZE: usize = 4;

/// Largest RTU ADU (RS485 limit)
pub const RTU_MAX_SIZE: usize = 256;

/// Exception response: Unit ID(1) + Function|0x80(1) + Code(1) + CRC(2)
pub const RTU_EXCEPTION_SIZE: usize = 5;

/// Receive buffer capacity for one exchange
pub const TCP_MAX_LENGTH: usize = 260;

/// Bit set on the echoed function code of an exception response
pub const EXCEPTION_FLAG: u8 = 0x80;

// ============================================================================
// Function Codes
// ============================================================================

pub const FC_READ_COILS: u8 = 0x01;
pub const FC_READ_DISCRETE_INPUTS: u8 = 0x02;
pub const FC_READ_HOLDING_REGISTERS: u8 = 0x03;
pub const FC_READ_INPUT_REGISTERS: u8 = 0x04;
pub const FC_WRITE_SINGLE_COIL: u8 = 0x05;
pub const FC_WRITE_SINGLE_REGISTER: u8 = 0x06;
pub const FC_WRITE_MULTIPLE_COILS: u8 = 0x0F;
pub const FC_WRITE_MULTIPLE_REGISTERS: u8 = 0x10;
pub const FC_MASK_WRITE_REGISTER: u8 = 0x16;
pub const FC_READ_WRITE_MULTIPLE_REGISTERS: u8 = 0x17;
pub const FC_READ_FIFO_QUEUE: u8 = 0x18;

/// Quantity field of a read/write request (bytes 4..6 of the ADU)
fn request_quantity(adu: &[u8]) -> Option<usize> {
    match adu.get(4..6) {
        Some(&[hi, lo]) => Some(u16::from_be_bytes([hi, lo]) as usize),
        _ => None,
    }
}

/// Expected length of the normal response to `adu`
///
/// Returns [`RTU_MIN_SIZE`] when the length cannot be determined from the
/// request (unknown function, FIFO queue reads, truncated request).
pub fn calculate_response_length(adu: &[u8]) -> usize {
    let Some(&function) = adu.get(1) else {
        return RTU_MIN_SIZE;
    };

    let extra = match function {
        FC_READ_COILS | FC_READ_DISCRETE_INPUTS => {
            request_quantity(adu).map_or(0, |count| 1 + count.div_ceil(8))
        },
        FC_READ_HOLDING_REGISTERS | FC_READ_INPUT_REGISTERS | FC_READ_WRITE_MULTIPLE_REGISTERS => {
            request_quantity(adu).map_or(0, |count| 1 + count * 2)
        },
        FC_WRITE_SINGLE_COIL
        | FC_WRITE_SINGLE_REGISTER
        | FC_WRITE_MULTIPLE_COILS
        | FC_WRITE_MULTIPLE_REGISTERS => 4,
        FC_MASK_WRITE_REGISTER => 6,
        // FIFO responses carry their own byte count
        FC_READ_FIFO_QUEUE => 0,
        _ => 0,
    };

    RTU_MIN_SIZE + extra
}

/// Function code echoed by an exception response to `function`
pub fn exception_function(function: u8) -> u8 {
    function | EXCEPTION_FLAG
}

/// Format bytes as lower-case, space separated hex
pub fn hex_dump(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}
