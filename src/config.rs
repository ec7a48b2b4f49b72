use std::fmt::{self, Display};

use crate::bitstream::{ANNEXB_START_CODE, BitReader};
use crate::{BackendError, BackendKind, Dimensions};

/// Four-character code of an ISO-BMFF box or sample entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FourCc(pub [u8; 4]);

impl FourCc {
    pub const fn new(code: &[u8; 4]) -> Self {
        Self(*code)
    }

    pub const fn from_u32(value: u32) -> Self {
        Self(value.to_be_bytes())
    }
}

impl Display for FourCc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            let ch = if byte.is_ascii_graphic() || byte == b' ' {
                char::from(byte)
            } else {
                '.'
            };
            write!(f, "{ch}")?;
        }
        Ok(())
    }
}

/// Decoder input description derived from a container's codec record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VideoConfiguration {
    pub mime_type: String,
    /// Size of the big-endian length field in front of each NAL unit;
    /// `None` when samples carry start codes.
    pub nal_length_size: Option<u8>,
    pub dims: Option<Dimensions>,
    /// Every parameter set from the record, start-code prefixed, as one
    /// buffer.
    pub initialization_data: Vec<u8>,
}

impl Display for VideoConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "VideoConfiguration(mime={}, nal_length_size={:?}, dims={}, init_bytes={})",
            self.mime_type,
            self.nal_length_size,
            self.dims.map_or_else(|| "unknown".to_string(), |d| d.to_string()),
            self.initialization_data.len()
        )
    }
}

/// Parser for a sample entry the host's container layer does not know.
pub trait CodecConfigParser: Send + Sync {
    /// Sample entry type, e.g. `vvc1`.
    fn sample_entry(&self) -> FourCc;

    /// Configuration box inside the sample entry, e.g. `vvcC`.
    fn config_box(&self) -> FourCc;

    fn mime_type(&self) -> &'static str;

    /// `record` starts at the configuration box header.
    fn parse(&self, record: &[u8]) -> Result<VideoConfiguration, BackendError>;
}

const DCI_NUT: u32 = 13;
const OPI_NUT: u32 = 12;

/// `vvcC` (VvcDecoderConfigurationRecord) parser.
#[derive(Debug, Default, Clone, Copy)]
pub struct VvcConfigParser;

impl VvcConfigParser {
    pub const SAMPLE_ENTRY: FourCc = FourCc::new(b"vvc1");
    pub const CONFIG_BOX: FourCc = FourCc::new(b"vvcC");
}

impl CodecConfigParser for VvcConfigParser {
    fn sample_entry(&self) -> FourCc {
        Self::SAMPLE_ENTRY
    }

    fn config_box(&self) -> FourCc {
        Self::CONFIG_BOX
    }

    fn mime_type(&self) -> &'static str {
        BackendKind::Vvc.mime_type()
    }

    fn parse(&self, record: &[u8]) -> Result<VideoConfiguration, BackendError> {
        let mut reader = BitReader::new(record);

        let box_size = reader.read_u32()? as usize;
        let box_type = FourCc::from_u32(reader.read_u32()?);
        if box_type != Self::CONFIG_BOX {
            return Err(BackendError::InvalidConfiguration(format!(
                "expected {} box, found {box_type}",
                Self::CONFIG_BOX
            )));
        }
        if box_size > record.len() {
            return Err(BackendError::InvalidConfiguration(format!(
                "box declares {box_size} bytes but only {} present",
                record.len()
            )));
        }
        // full box version + flags
        reader.skip_bits(32)?;

        reader.skip_bits(5)?;
        let length_size = reader.read_bits(2)? as u8 + 1;
        let dims = if reader.read_bit()? {
            read_ptl_block(&mut reader)?
        } else {
            None
        };

        let num_arrays = reader.read_u8()?;
        let mut initialization_data = Vec::new();
        for _ in 0..num_arrays {
            // array_completeness + reserved
            reader.skip_bits(3)?;
            let nal_unit_type = reader.read_bits(5)?;
            let num_nalus = if nal_unit_type == DCI_NUT || nal_unit_type == OPI_NUT {
                1
            } else {
                reader.read_u16()?
            };
            for _ in 0..num_nalus {
                let nal_len = usize::from(reader.read_u16()?);
                initialization_data.extend_from_slice(&ANNEXB_START_CODE);
                initialization_data.extend_from_slice(reader.read_bytes(nal_len)?);
            }
        }

        Ok(VideoConfiguration {
            mime_type: self.mime_type().to_string(),
            nal_length_size: Some(length_size),
            dims,
            initialization_data,
        })
    }
}

/// Reads the optional PTL block and returns the declared maximum picture size.
fn read_ptl_block(reader: &mut BitReader<'_>) -> Result<Option<Dimensions>, BackendError> {
    // ols_idx(9)
    reader.skip_bits(9)?;
    let num_sublayers = reader.read_bits(3)?;
    // constant_frame_rate(2) chroma_format_idc(2) bit_depth_minus8(3) reserved(5)
    reader.skip_bits(12)?;

    // VvcPTLRecord
    reader.skip_bits(2)?;
    let num_bytes_constraint_info = reader.read_bits(6)? as usize;
    // general_profile_idc(7) tier(1) level(8) frame_only(1) multilayer(1)
    reader.skip_bits(18)?;
    reader.skip_bits((8 * num_bytes_constraint_info).saturating_sub(2))?;

    let mut sublayer_level_present = Vec::new();
    for _ in 0..num_sublayers.saturating_sub(1) {
        sublayer_level_present.push(reader.read_bit()?);
    }
    if num_sublayers > 1 {
        reader.skip_bits((9 - num_sublayers) as usize)?;
    }
    for present in sublayer_level_present {
        if present {
            reader.skip_bits(8)?;
        }
    }
    let num_sub_profiles = reader.read_u8()?;
    reader.skip_bits(32 * usize::from(num_sub_profiles))?;

    let max_width = reader.read_u16()?;
    let max_height = reader.read_u16()?;
    // avg_frame_rate
    reader.skip_bits(16)?;
    Ok(Dimensions::from_native(
        i32::from(max_width),
        i32::from(max_height),
    ))
}
