//! AX.25 frame and address model (§3).
//!
//! This module knows nothing about bits or HDLC framing — it interprets
//! already-deframed octet sequences (as produced by [`crate::hdlc`] and,
//! after a bad CRC, [`crate::retry`]).

use crate::crc;

/// One 7-octet AX.25 address field: 6 shifted-ASCII callsign characters
/// plus an SSID/flag octet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    /// Up to 6 characters, right-padded with spaces, already
    /// right-shifted out of the on-wire encoding.
    pub callsign: String,
    pub ssid: u8,
    /// Set on the last address in the list (wire bit 0 of the SSID
    /// octet).
    pub is_last: bool,
    /// C-bit / command-response bit (wire bit 7).
    pub command_bit: bool,
}

impl Address {
    /// Decode one 7-octet address field.
    pub fn from_wire(octets: &[u8; 7]) -> Self {
        let mut callsign = String::with_capacity(6);
        for &b in &octets[..6] {
            let ch = (b >> 1) as char;
            if ch != ' ' {
                callsign.push(ch);
            } else {
                callsign.push(' ');
            }
        }
        let callsign = callsign.trim_end().to_string();
        let ssid_octet = octets[6];
        Address {
            callsign,
            ssid: (ssid_octet >> 1) & 0x0f,
            is_last: ssid_octet & 0x01 != 0,
            command_bit: ssid_octet & 0x80 != 0,
        }
    }

    /// Encode back to the 7-octet wire form.
    pub fn to_wire(&self) -> [u8; 7] {
        let mut out = [0x40u8; 7]; // space, shifted, as padding
        let bytes = self.callsign.as_bytes();
        for i in 0..6 {
            let ch = bytes.get(i).copied().unwrap_or(b' ');
            out[i] = ch << 1;
        }
        let mut ssid_octet = (self.ssid & 0x0f) << 1;
        ssid_octet |= 0b0110_0000; // reserved bits conventionally set
        if self.is_last {
            ssid_octet |= 0x01;
        }
        if self.command_bit {
            ssid_octet |= 0x80;
        }
        out[6] = ssid_octet;
        out
    }
}

/// A fully decoded AX.25 frame (§3/§6).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ax25Frame {
    pub addresses: Vec<Address>,
    pub control: u8,
    pub pid: u8,
    pub info: Vec<u8>,
}

impl Ax25Frame {
    /// Parse a frame body (everything between the opening and closing
    /// flags, FCS included, already unstuffed and octet-packed by the
    /// HDLC framer). Returns `None` if the address field is malformed
    /// (wrong multiple of 7, or no terminated address found) — the FCS
    /// is assumed already verified by the caller.
    pub fn parse(body_with_fcs: &[u8]) -> Option<Self> {
        if body_with_fcs.len() < 2 {
            return None;
        }
        let body = &body_with_fcs[..body_with_fcs.len() - 2];
        let mut addresses = Vec::new();
        let mut offset = 0;
        loop {
            if offset + 7 > body.len() {
                return None;
            }
            let chunk: [u8; 7] = body[offset..offset + 7].try_into().ok()?;
            let addr = Address::from_wire(&chunk);
            let is_last = addr.is_last;
            addresses.push(addr);
            offset += 7;
            if is_last {
                break;
            }
            if addresses.len() > 10 {
                return None;
            }
        }
        if addresses.len() < 2 || addresses.len() > 10 {
            return None;
        }
        if offset + 2 > body.len() {
            return None;
        }
        let control = body[offset];
        let pid = body[offset + 1];
        let info = body[offset + 2..].to_vec();
        Some(Ax25Frame {
            addresses,
            control,
            pid,
            info,
        })
    }

    /// Encode to wire octets, FCS appended.
    pub fn to_wire(&self) -> Vec<u8> {
        let mut body = Vec::new();
        for (i, addr) in self.addresses.iter().enumerate() {
            let mut a = addr.clone();
            a.is_last = i == self.addresses.len() - 1;
            body.extend_from_slice(&a.to_wire());
        }
        body.push(self.control);
        body.push(self.pid);
        body.extend_from_slice(&self.info);
        crc::append_fcs(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_roundtrip() {
        let addr = Address {
            callsign: "WB2OSZ".to_string(),
            ssid: 9,
            is_last: true,
            command_bit: false,
        };
        let wire = addr.to_wire();
        let back = Address::from_wire(&wire);
        assert_eq!(back.callsign, "WB2OSZ");
        assert_eq!(back.ssid, 9);
        assert!(back.is_last);
    }

    #[test]
    fn frame_roundtrip() {
        let frame = Ax25Frame {
            addresses: vec![
                Address {
                    callsign: "APDW15".to_string(),
                    ssid: 0,
                    is_last: false,
                    command_bit: false,
                },
                Address {
                    callsign: "WB2OSZ".to_string(),
                    ssid: 9,
                    is_last: true,
                    command_bit: true,
                },
            ],
            control: 0x03,
            pid: 0xF0,
            info: b">test".to_vec(),
        };
        let wire = frame.to_wire();
        let parsed = Ax25Frame::parse(&wire).expect("should parse");
        assert_eq!(parsed, frame);
    }

    #[test]
    fn parse_rejects_address_count_outside_2_to_10() {
        // A single address with is_last set, followed by garbage that
        // doesn't extend to a valid control/pid/FCS, should fail.
        let addr = Address {
            callsign: "N0CALL".to_string(),
            ssid: 0,
            is_last: true,
            command_bit: false,
        };
        let mut body = addr.to_wire().to_vec();
        body.push(0x03);
        body.push(0xf0);
        let framed = crc::append_fcs(&body);
        // Only one address: invalid (need >= 2).
        assert!(Ax25Frame::parse(&framed).is_none());
    }
}
