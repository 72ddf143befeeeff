//! WAV container helpers.
//!
//! Engines hand us whole WAV buffers; the streaming path only ever
//! sends raw PCM, so the pacer strips the container header before
//! windowing. The header length is fixed for the canonical 44-byte
//! RIFF layout hound writes for 16-bit PCM.

use std::io::Cursor;

/// Canonical RIFF/WAVE header length for 16-bit PCM.
pub const WAV_HEADER_LEN: usize = 44;

/// Encode PCM f32 samples as a 16-bit PCM WAV (RIFF) buffer.
pub fn encode_wav(samples: &[f32], sample_rate: u32) -> anyhow::Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    // Pre-allocate: header + 2 bytes per sample.
    let mut cursor = Cursor::new(Vec::<u8>::with_capacity(WAV_HEADER_LEN + samples.len() * 2));
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)
            .map_err(|e| anyhow::anyhow!("wav write err: {e}"))?;

        for &s in samples {
            // Clamp and convert f32 [-1.0, 1.0] -> i16
            let v = (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
            writer
                .write_sample(v)
                .map_err(|e| anyhow::anyhow!("wav sample err: {e}"))?;
        }
        // `writer` drops here, which finalizes the WAV header/footer
    }

    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoded_wav_has_canonical_header() {
        let buf = encode_wav(&[0.0, 0.5, -0.5, 1.0], 22050).unwrap();
        assert_eq!(&buf[0..4], b"RIFF");
        assert_eq!(&buf[8..12], b"WAVE");
        assert_eq!(buf.len(), WAV_HEADER_LEN + 4 * 2);
    }

    #[test]
    fn samples_are_little_endian_i16() {
        let buf = encode_wav(&[1.0], 22050).unwrap();
        let payload = &buf[WAV_HEADER_LEN..];
        assert_eq!(payload, i16::MAX.to_le_bytes());
    }
}
