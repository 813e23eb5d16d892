//! Human-readable rendering of decoded AX.25 frames and hex dumps.

use direwolf_core::ax25::Ax25Frame;

/// Render an AX.25 frame's address list as `SRC>DEST,DIGI1,DIGI2*` path
/// notation, the way Dire Wolf's own frame dumps do.
pub fn format_path(frame: &Ax25Frame) -> String {
    if frame.addresses.len() < 2 {
        return String::new();
    }

    let fmt_addr = |idx: usize| -> String {
        let addr = &frame.addresses[idx];
        let mut s = addr.callsign.clone();
        if addr.ssid != 0 {
            s.push('-');
            s.push_str(&addr.ssid.to_string());
        }
        if idx >= 2 && addr.is_last {
            s.push('*');
        }
        s
    };

    let dest = fmt_addr(0);
    let src = fmt_addr(1);
    let mut path = format!("{}>{}", src, dest);
    for idx in 2..frame.addresses.len() {
        path.push(',');
        path.push_str(&fmt_addr(idx));
    }
    path
}

/// Human-readable summary of the control/PID octets: UI-frame, I-frame
/// sequence numbers, or a raw hex fallback for control fields this
/// renderer doesn't name.
pub fn describe_control(control: u8, pid: u8) -> String {
    if control == 0x03 {
        format!("UI, pid=0x{:02X}", pid)
    } else if control & 0x01 == 0 {
        let ns = (control >> 1) & 0x07;
        let nr = (control >> 5) & 0x07;
        format!("I, N(S)={}, N(R)={}, pid=0x{:02X}", ns, nr, pid)
    } else if control & 0x03 == 0x01 {
        let nr = (control >> 5) & 0x07;
        format!("S, N(R)={}, control=0x{:02X}", nr, control)
    } else {
        format!("U, control=0x{:02X}", control)
    }
}

/// Render the info field as printable ASCII, replacing non-printable
/// bytes with `.`, truncated to `max_chars`.
pub fn info_preview(info: &[u8], max_chars: usize) -> String {
    info.iter()
        .take(max_chars)
        .map(|&b| if (32..=126).contains(&b) { b as char } else { '.' })
        .collect()
}

/// Render a byte slice as a space-separated hex dump, a fixed number of
/// octets per line.
pub fn hex_dump(bytes: &[u8], octets_per_line: usize) -> String {
    bytes
        .chunks(octets_per_line)
        .map(|chunk| {
            chunk
                .iter()
                .map(|b| format!("{:02X}", b))
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// One line of human-readable output for a decoded frame, the shape
/// printed to the terminal and embedded in `LogEvent::FrameDecoded`.
pub fn summarize(frame: &Ax25Frame) -> String {
    format!(
        "{}: {} [{}]",
        format_path(frame),
        describe_control(frame.control, frame.pid),
        info_preview(&frame.info, 64)
    )
}
