//! PCM frame codec for the realtime channel.
//!
//! Outbound: f32 sample frames are clamped to [-1.0, 1.0], converted to
//! 16-bit little-endian PCM, and base64-encoded, one wire payload per frame.
//! Inbound audio payloads run the same path in reverse.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use wayfarer_core::error::{Result, WayfarerError};

/// Encode one microphone frame as a base64 PCM16-LE payload.
pub fn encode_frame(samples: &[f32]) -> String {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        let clamped = sample.clamp(-1.0, 1.0);
        let value = (clamped * i16::MAX as f32) as i16;
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    STANDARD.encode(bytes)
}

/// Decode a base64 PCM16-LE payload back to f32 samples.
///
/// A trailing odd byte is rejected as malformed.
pub fn decode_pcm16(data: &str) -> Result<Vec<f32>> {
    let bytes = STANDARD
        .decode(data)
        .map_err(|e| WayfarerError::Live(format!("Malformed audio payload: {}", e)))?;
    if bytes.len() % 2 != 0 {
        return Err(WayfarerError::Live(
            "Malformed audio payload: odd byte count".to_string(),
        ));
    }
    Ok(bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
        .collect())
}

/// Playback duration of a sample count at the given rate.
pub fn duration_secs(samples: usize, sample_rate: u32) -> f64 {
    if sample_rate == 0 {
        return 0.0;
    }
    samples as f64 / sample_rate as f64
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_clamps_out_of_range_samples() {
        let encoded = encode_frame(&[2.0, -3.5]);
        let decoded = decode_pcm16(&encoded).unwrap();
        assert!(decoded[0] > 0.99);
        assert!(decoded[1] < -0.99);
    }

    #[test]
    fn test_round_trip_preserves_silence_and_peaks() {
        let frame = [0.0_f32, 1.0, -1.0, 0.5];
        let decoded = decode_pcm16(&encode_frame(&frame)).unwrap();
        assert_eq!(decoded.len(), 4);
        assert!(decoded[0].abs() < 1e-4);
        assert!((decoded[1] - 1.0).abs() < 1e-3);
        assert!((decoded[2] + 1.0).abs() < 1e-3);
        assert!((decoded[3] - 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_encode_empty_frame() {
        assert_eq!(encode_frame(&[]), "");
        assert!(decode_pcm16("").unwrap().is_empty());
    }

    #[test]
    fn test_decode_rejects_invalid_base64() {
        assert!(decode_pcm16("not base64!!!").is_err());
    }

    #[test]
    fn test_decode_rejects_odd_byte_count() {
        let odd = STANDARD.encode([0x01, 0x02, 0x03]);
        assert!(decode_pcm16(&odd).is_err());
    }

    #[test]
    fn test_duration() {
        assert_eq!(duration_secs(24_000, 24_000), 1.0);
        assert_eq!(duration_secs(12_000, 24_000), 0.5);
        assert_eq!(duration_secs(100, 0), 0.0);
    }
}
