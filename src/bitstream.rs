use crate::BackendError;

pub const ANNEXB_START_CODE: [u8; 4] = [0, 0, 0, 1];

/// MSB-first reader over a byte slice.
#[derive(Debug, Clone)]
pub(crate) struct BitReader<'a> {
    data: &'a [u8],
    bit_pos: usize,
}

impl<'a> BitReader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, bit_pos: 0 }
    }

    pub(crate) fn bits_left(&self) -> usize {
        (self.data.len() * 8).saturating_sub(self.bit_pos)
    }

    pub(crate) fn byte_position(&self) -> usize {
        self.bit_pos / 8
    }

    fn ensure(&self, bits: usize) -> Result<(), BackendError> {
        if self.bits_left() < bits {
            return Err(BackendError::InvalidConfiguration(format!(
                "record truncated at byte {}: need {bits} more bits",
                self.byte_position()
            )));
        }
        Ok(())
    }

    pub(crate) fn read_bit(&mut self) -> Result<bool, BackendError> {
        self.ensure(1)?;
        let byte = self.data[self.bit_pos / 8];
        let bit = (byte >> (7 - (self.bit_pos % 8))) & 1;
        self.bit_pos += 1;
        Ok(bit == 1)
    }

    pub(crate) fn read_bits(&mut self, count: u32) -> Result<u32, BackendError> {
        debug_assert!(count <= 32);
        self.ensure(count as usize)?;
        let mut value = 0u32;
        for _ in 0..count {
            value = (value << 1) | u32::from(self.read_bit()?);
        }
        Ok(value)
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8, BackendError> {
        self.read_bits(8).map(|v| v as u8)
    }

    pub(crate) fn read_u16(&mut self) -> Result<u16, BackendError> {
        self.read_bits(16).map(|v| v as u16)
    }

    pub(crate) fn read_u32(&mut self) -> Result<u32, BackendError> {
        self.read_bits(32)
    }

    pub(crate) fn skip_bits(&mut self, count: usize) -> Result<(), BackendError> {
        self.ensure(count)?;
        self.bit_pos += count;
        Ok(())
    }

    /// Byte-aligned slice read; fails when the cursor sits mid-byte.
    pub(crate) fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], BackendError> {
        if self.bit_pos % 8 != 0 {
            return Err(BackendError::InvalidConfiguration(
                "byte read from unaligned position".to_string(),
            ));
        }
        self.ensure(len * 8)?;
        let start = self.byte_position();
        self.bit_pos += len * 8;
        Ok(&self.data[start..start + len])
    }
}

/// Rewrites a sample of `length_size`-byte big-endian length-prefixed NAL
/// units into start-code-prefixed form.
pub fn length_prefixed_to_annexb(sample: &[u8], length_size: u8) -> Result<Vec<u8>, BackendError> {
    let mut out = Vec::with_capacity(sample.len() + 16);
    append_as_annexb(&mut out, sample, length_size)?;
    Ok(out)
}

fn append_as_annexb(out: &mut Vec<u8>, sample: &[u8], length_size: u8) -> Result<(), BackendError> {
    if !(1..=4).contains(&length_size) {
        return Err(BackendError::InvalidInput(format!(
            "NAL length size must be 1..=4, got {length_size}"
        )));
    }
    let width = usize::from(length_size);
    let mut payload = sample;
    while !payload.is_empty() {
        if payload.len() < width {
            return Err(BackendError::InvalidInput(
                "trailing bytes after length-prefixed sample parse".to_string(),
            ));
        }
        let nal_len = payload[..width]
            .iter()
            .fold(0usize, |acc, byte| (acc << 8) | usize::from(*byte));
        payload = &payload[width..];
        if nal_len == 0 || payload.len() < nal_len {
            return Err(BackendError::InvalidInput(
                "invalid length-prefixed sample payload".to_string(),
            ));
        }
        out.extend_from_slice(&ANNEXB_START_CODE);
        out.extend_from_slice(&payload[..nal_len]);
        payload = &payload[nal_len..];
    }
    Ok(())
}

/// Prepares access units for a decoder that only understands Annex-B.
///
/// Parameter sets from the codec configuration are prepended to the first
/// access unit after creation or a flush. The prefix stays armed until
/// [`AnnexBFramer::commit`] confirms the framed unit was accepted, so a
/// retried submission carries it again.
#[derive(Debug, Default)]
pub struct AnnexBFramer {
    parameter_sets: Vec<u8>,
    length_size: Option<u8>,
    prefix_armed: bool,
    scratch: Vec<u8>,
}

impl AnnexBFramer {
    /// `length_size` of `None` means samples already carry start codes.
    pub fn new(parameter_sets: Vec<u8>, length_size: Option<u8>) -> Self {
        Self {
            prefix_armed: !parameter_sets.is_empty(),
            parameter_sets,
            length_size,
            scratch: Vec::new(),
        }
    }

    pub fn prefix_armed(&self) -> bool {
        self.prefix_armed
    }

    pub fn frame<'a>(&'a mut self, sample: &'a [u8]) -> Result<&'a [u8], BackendError> {
        if !self.prefix_armed && self.length_size.is_none() {
            return Ok(sample);
        }
        self.scratch.clear();
        if self.prefix_armed {
            self.scratch.extend_from_slice(&self.parameter_sets);
        }
        match self.length_size {
            Some(size) => append_as_annexb(&mut self.scratch, sample, size)?,
            None => self.scratch.extend_from_slice(sample),
        }
        Ok(&self.scratch)
    }

    pub fn commit(&mut self) {
        self.prefix_armed = false;
    }

    /// Called after the native decoder lost its parameter sets.
    pub fn rearm(&mut self) {
        self.prefix_armed = !self.parameter_sets.is_empty();
    }
}
