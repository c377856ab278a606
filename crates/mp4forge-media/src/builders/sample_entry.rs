//! Sample description boxes for video tracks.

use crate::boxes::{BoxNode, Field, FourCc};
use crate::tables::Sample;
use crate::{Error, Result};

/// Compressor name field is a fixed 32-byte Pascal string.
const COMPRESSOR_NAME_LEN: usize = 32;

/// Decoder configuration carried by a visual sample entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecConfig {
    /// AVCDecoderConfigurationRecord, written as `avc1` + `avcC`.
    Avc(Vec<u8>),
    /// HEVCDecoderConfigurationRecord, written as `hvc1` + `hvcC`.
    Hevc(Vec<u8>),
}

impl CodecConfig {
    pub fn entry_type(&self) -> FourCc {
        match self {
            Self::Avc(_) => FourCc::AVC1,
            Self::Hevc(_) => FourCc::HVC1,
        }
    }

    pub fn config_type(&self) -> FourCc {
        match self {
            Self::Avc(_) => FourCc::AVCC,
            Self::Hevc(_) => FourCc::HVCC,
        }
    }

    pub fn record(&self) -> &[u8] {
        match self {
            Self::Avc(record) | Self::Hevc(record) => record,
        }
    }

    fn to_box(&self) -> BoxNode {
        BoxNode::new(self.config_type()).field(Field::bytes(self.record()))
    }
}

/// `btrt` values, all in bits per second except the buffer size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BitrateHint {
    pub buffer_size_db: u32,
    pub max_bitrate: u32,
    pub avg_bitrate: u32,
}

impl BitrateHint {
    /// Derive bitrates from the sample list. The maximum is taken over
    /// every one-second window that starts on a sample.
    pub fn from_samples(samples: &[Sample], timescale: u32) -> Self {
        if samples.is_empty() || timescale == 0 {
            return Self::default();
        }
        let total_bytes: u128 = samples.iter().map(|s| s.size as u128).sum();
        let total_duration: u128 = samples.iter().map(|s| s.duration as u128).sum();
        let avg = if total_duration == 0 {
            0
        } else {
            total_bytes * 8 * timescale as u128 / total_duration
        };
        let timescale = timescale as u64;

        let mut max_window = 0u64;
        let mut window_bytes = 0u64;
        let mut end = 0usize;
        for (start, sample) in samples.iter().enumerate() {
            let limit = sample.dts.saturating_add(timescale);
            while end < samples.len() && (end <= start || samples[end].dts < limit) {
                window_bytes += samples[end].size as u64;
                end += 1;
            }
            max_window = max_window.max(window_bytes);
            window_bytes -= sample.size as u64;
        }

        Self {
            buffer_size_db: samples.iter().map(|s| s.size).max().unwrap_or(0),
            max_bitrate: clamp_u32(max_window as u128 * 8),
            avg_bitrate: clamp_u32(avg),
        }
    }

    fn to_box(self) -> BoxNode {
        BoxNode::new(FourCc::BTRT)
            .field(Field::u32(self.buffer_size_db))
            .field(Field::u32(self.max_bitrate))
            .field(Field::u32(self.avg_bitrate))
    }
}

fn clamp_u32(value: u128) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

/// Parameters of a visual sample entry.
#[derive(Debug, Clone)]
pub struct VisualSampleEntry {
    pub codec: CodecConfig,
    pub width: u16,
    pub height: u16,
    pub compressor_name: String,
    /// Horizontal and vertical spacing for a `pasp` box.
    pub pixel_aspect: Option<(u32, u32)>,
    pub bitrate: Option<BitrateHint>,
}

impl VisualSampleEntry {
    pub fn new(codec: CodecConfig, width: u16, height: u16) -> Self {
        Self {
            codec,
            width,
            height,
            compressor_name: String::new(),
            pixel_aspect: None,
            bitrate: None,
        }
    }

    pub fn with_pixel_aspect(mut self, h_spacing: u32, v_spacing: u32) -> Self {
        self.pixel_aspect = Some((h_spacing, v_spacing));
        self
    }

    pub fn with_bitrate(mut self, hint: BitrateHint) -> Self {
        self.bitrate = Some(hint);
        self
    }

    pub fn with_compressor_name(mut self, name: impl Into<String>) -> Self {
        self.compressor_name = name.into();
        self
    }

    /// The sample entry box: fixed visual fields in the body, then the
    /// codec configuration and optional `pasp` / `btrt` as children.
    pub fn to_box(&self) -> Result<BoxNode> {
        if self.codec.record().is_empty() {
            return Err(Error::unsupported(format!(
                "{} sample entry needs a decoder configuration record",
                self.codec.entry_type()
            )));
        }
        Ok(BoxNode::new(self.codec.entry_type())
            .field(Field::zeros(6)) // reserved
            .field(Field::u16(1)) // data reference index
            .field(Field::u16(0)) // pre_defined
            .field(Field::u16(0)) // reserved
            .field(Field::u32_array(vec![0; 3])) // pre_defined
            .field(Field::u16(self.width))
            .field(Field::u16(self.height))
            .field(Field::fixed_16_16(72, 0)) // horizontal resolution
            .field(Field::fixed_16_16(72, 0)) // vertical resolution
            .field(Field::u32(0)) // reserved
            .field(Field::u16(1)) // frame count
            .field(Field::bytes(&compressor_name(&self.compressor_name)?))
            .field(Field::u16(0x0018)) // depth
            .field(Field::u16(0xFFFF)) // pre_defined = -1
            .child(self.codec.to_box())
            .child_opt(self.pixel_aspect.map(|(h, v)| pasp(h, v)))
            .child_opt(self.bitrate.map(BitrateHint::to_box)))
    }
}

fn compressor_name(name: &str) -> Result<[u8; COMPRESSOR_NAME_LEN]> {
    let bytes = name.as_bytes();
    if bytes.len() >= COMPRESSOR_NAME_LEN {
        return Err(Error::unsupported(format!(
            "compressor name {name:?} exceeds {} bytes",
            COMPRESSOR_NAME_LEN - 1
        )));
    }
    let mut out = [0u8; COMPRESSOR_NAME_LEN];
    out[0] = bytes.len() as u8;
    out[1..=bytes.len()].copy_from_slice(bytes);
    Ok(out)
}

/// `pasp`: pixel aspect ratio as h_spacing:v_spacing.
pub fn pasp(h_spacing: u32, v_spacing: u32) -> BoxNode {
    BoxNode::new(FourCc::PASP)
        .field(Field::u32(h_spacing))
        .field(Field::u32(v_spacing))
}

/// `stsd` with a single sample entry embedded in its body.
pub fn stsd(entry: &VisualSampleEntry) -> Result<BoxNode> {
    Ok(BoxNode::full(FourCc::STSD, 0, 0)
        .field(Field::u32(1))
        .field(Field::inline(entry.to_box()?)))
}
