//! Wire format: a single UTF-8 datagram `"<hr>,<rr>"`
//!
//! No framing, no length prefix, no sequence number.

use super::channel::SignalSample;

/// Largest datagram the receiver accepts; longer payloads are discarded whole
pub const MAX_DATAGRAM_LEN: usize = 256;

/// Parse a datagram payload into a sample.
///
/// Returns `None` for anything that is not exactly two comma-separated
/// floating-point fields.
pub fn parse_datagram(payload: &[u8]) -> Option<SignalSample> {
    let text = std::str::from_utf8(payload).ok()?;
    let mut fields = text.split(',');
    let hr = fields.next()?.trim().parse::<f32>().ok()?;
    let rr = fields.next()?.trim().parse::<f32>().ok()?;
    if fields.next().is_some() {
        return None;
    }
    Some(SignalSample::new(hr, rr))
}

/// Encode a sample the way the sensor bridge does
pub fn encode_datagram(sample: &SignalSample) -> String {
    format!("{},{}", sample.heart_rate, sample.rr_interval)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        assert_eq!(
            parse_datagram(b"72,833.3"),
            Some(SignalSample::new(72.0, 833.3))
        );
        assert_eq!(
            parse_datagram(b"101.5, 591\n"),
            Some(SignalSample::new(101.5, 591.0))
        );
    }

    #[test]
    fn test_values_pass_through_unchanged() {
        for (hr, rr) in [(48.25_f32, 1243.75_f32), (180.0, 333.0), (0.5, 0.25)] {
            let payload = encode_datagram(&SignalSample::new(hr, rr));
            let sample = parse_datagram(payload.as_bytes()).unwrap();
            assert_eq!(sample.heart_rate, hr);
            assert_eq!(sample.rr_interval, rr);
        }
    }

    #[test]
    fn test_parse_rejects_malformed() {
        let bad: [&[u8]; 8] = [
            b"",
            b"72",
            b"72,",
            b",800",
            b"72,800,1",
            b"seventy,800",
            b"72;800",
            &[0xff, 0xfe, b',', b'1'],
        ];
        for payload in bad {
            assert_eq!(parse_datagram(payload), None, "payload {:?}", payload);
        }
    }
}
