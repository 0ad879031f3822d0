//! Wraps raw linear PCM into a canonical 44-byte RIFF/WAVE container.
//!
//! The remote model hands back headerless mono samples together with a
//! format descriptor such as `audio/L16;codec=pcm;rate=24000`. Parsing never
//! fails: anything unreadable falls back to 16-bit / 24 kHz.

/// Bits per sample assumed when the descriptor does not say.
pub const DEFAULT_BITS_PER_SAMPLE: u16 = 16;
/// Sample rate assumed when the descriptor does not say.
pub const DEFAULT_SAMPLE_RATE: u32 = 24_000;
/// Size of the canonical header written by [`wrap_as_wave`].
pub const WAVE_HEADER_LEN: usize = 44;

const CHANNELS: u16 = 1;
const PCM_FORMAT_TAG: u16 = 1;
const FMT_CHUNK_LEN: u32 = 16;

/// Sample layout extracted from a format descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcmFormat {
    pub bits_per_sample: u16,
    pub sample_rate: u32,
}

impl Default for PcmFormat {
    fn default() -> Self {
        Self {
            bits_per_sample: DEFAULT_BITS_PER_SAMPLE,
            sample_rate: DEFAULT_SAMPLE_RATE,
        }
    }
}

/// Parse `audio/L<bits>;rate=<hz>` style descriptors.
///
/// Segments are split on `;` and trimmed. `rate=` is matched
/// case-insensitively, `audio/L` is matched as written. A segment whose
/// number does not parse leaves the corresponding default in place.
pub fn parse_format_descriptor(descriptor: &str) -> PcmFormat {
    let mut format = PcmFormat::default();

    for segment in descriptor.split(';').map(str::trim) {
        if segment
            .get(..5)
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case("rate="))
        {
            if let Ok(rate) = segment[5..].parse::<u32>() {
                format.sample_rate = rate;
            }
        } else if let Some(bits) = segment.strip_prefix("audio/L") {
            if let Ok(bits) = bits.parse::<u16>() {
                format.bits_per_sample = bits;
            }
        }
    }

    format
}

/// Prefix `raw` with a mono PCM WAVE header derived from `descriptor`.
pub fn wrap_as_wave(raw: &[u8], descriptor: &str) -> Vec<u8> {
    let format = parse_format_descriptor(descriptor);
    let bytes_per_sample = format.bits_per_sample / 8;
    let block_align = CHANNELS * bytes_per_sample;
    // Header fields are 32-bit; oversized values clamp instead of wrapping.
    let byte_rate = format.sample_rate.saturating_mul(u32::from(block_align));
    let data_len = u32::try_from(raw.len()).unwrap_or(u32::MAX);

    let mut out = Vec::with_capacity(WAVE_HEADER_LEN + raw.len());
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&data_len.saturating_add(36).to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&FMT_CHUNK_LEN.to_le_bytes());
    out.extend_from_slice(&PCM_FORMAT_TAG.to_le_bytes());
    out.extend_from_slice(&CHANNELS.to_le_bytes());
    out.extend_from_slice(&format.sample_rate.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&format.bits_per_sample.to_le_bytes());
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());
    out.extend_from_slice(raw);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u16_at(buf: &[u8], offset: usize) -> u16 {
        u16::from_le_bytes([buf[offset], buf[offset + 1]])
    }

    fn u32_at(buf: &[u8], offset: usize) -> u32 {
        u32::from_le_bytes(buf[offset..offset + 4].try_into().unwrap())
    }

    #[test]
    fn parses_bits_and_rate() {
        assert_eq!(
            parse_format_descriptor("audio/L24;rate=48000"),
            PcmFormat {
                bits_per_sample: 24,
                sample_rate: 48_000
            }
        );
    }

    #[test]
    fn parses_gemini_style_descriptor() {
        let format = parse_format_descriptor("audio/L16;codec=pcm;rate=24000");
        assert_eq!(format.bits_per_sample, 16);
        assert_eq!(format.sample_rate, 24_000);
    }

    #[test]
    fn garbage_falls_back_to_defaults() {
        assert_eq!(parse_format_descriptor("garbage"), PcmFormat::default());
        assert_eq!(parse_format_descriptor(""), PcmFormat::default());
        assert_eq!(parse_format_descriptor("audio/wav"), PcmFormat::default());
    }

    #[test]
    fn rate_key_is_case_insensitive_and_trimmed() {
        let format = parse_format_descriptor("audio/L8 ;  RATE=8000 ");
        assert_eq!(format.bits_per_sample, 8);
        assert_eq!(format.sample_rate, 8000);
    }

    #[test]
    fn unparseable_numbers_keep_defaults_independently() {
        let format = parse_format_descriptor("audio/Lxx;rate=44100");
        assert_eq!(format.bits_per_sample, DEFAULT_BITS_PER_SAMPLE);
        assert_eq!(format.sample_rate, 44_100);

        let format = parse_format_descriptor("audio/L32;rate=fast");
        assert_eq!(format.bits_per_sample, 32);
        assert_eq!(format.sample_rate, DEFAULT_SAMPLE_RATE);
    }

    #[test]
    fn header_layout_is_canonical() {
        let raw = vec![0xABu8; 1000];
        let wav = wrap_as_wave(&raw, "audio/L16;rate=24000");

        assert_eq!(wav.len(), 1044);
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(u32_at(&wav, 4), 1036);
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(&wav[12..16], b"fmt ");
        assert_eq!(u32_at(&wav, 16), 16);
        assert_eq!(u16_at(&wav, 20), 1);
        assert_eq!(u16_at(&wav, 22), 1);
        assert_eq!(u32_at(&wav, 24), 24_000);
        assert_eq!(u32_at(&wav, 28), 48_000);
        assert_eq!(u16_at(&wav, 32), 2);
        assert_eq!(u16_at(&wav, 34), 16);
        assert_eq!(&wav[36..40], b"data");
        assert_eq!(u32_at(&wav, 40), 1000);
        assert_eq!(&wav[44..], raw.as_slice());
    }

    #[test]
    fn byte_rate_follows_descriptor() {
        let wav = wrap_as_wave(&[0u8; 6], "audio/L24;rate=48000");
        assert_eq!(u32_at(&wav, 24), 48_000);
        assert_eq!(u32_at(&wav, 28), 144_000);
        assert_eq!(u16_at(&wav, 32), 3);
        assert_eq!(u16_at(&wav, 34), 24);
    }

    #[test]
    fn length_fields_track_payload_size() {
        for len in [0usize, 1, 2, 511, 4096] {
            let wav = wrap_as_wave(&vec![0u8; len], "audio/L16;rate=16000");
            assert_eq!(wav.len(), WAVE_HEADER_LEN + len);
            assert_eq!(u32_at(&wav, 4) as usize, 36 + len);
            assert_eq!(u32_at(&wav, 40) as usize, len);
        }
    }

    #[test]
    fn extreme_rate_clamps_byte_rate() {
        let wav = wrap_as_wave(&[0u8; 4], "audio/L16;rate=4000000000");
        assert_eq!(wav.len(), WAVE_HEADER_LEN + 4);
        assert_eq!(u32_at(&wav, 24), 4_000_000_000);
        assert_eq!(u32_at(&wav, 28), u32::MAX);
        assert_eq!(u32_at(&wav, 40), 4);

        let wav = wrap_as_wave(&[], "audio/L64;rate=4294967295");
        assert_eq!(u32_at(&wav, 28), u32::MAX);
        assert_eq!(u16_at(&wav, 32), 8);
    }
}
