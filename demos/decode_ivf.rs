use std::{fs, path::PathBuf};

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing_subscriber::EnvFilter;
use video_sw::{
    Av1ThreadHints, Dav1dAdapter, DecodeLoop, DecodeRequest, InputDisposition, LoopSettings,
    TimestampUs, builtin_registry,
};

#[derive(Parser, Debug)]
#[command(about = "Decode an AV1 IVF file through the dav1d backend")]
struct Args {
    #[arg(long)]
    input: PathBuf,
    #[arg(long, default_value_t = 2)]
    threads: u32,
    #[arg(long, default_value_t = 4)]
    output_slots: usize,
    /// Frames with a pts below this are decoded but flagged as skip.
    #[arg(long, default_value_t = 0)]
    start_us: i64,
    #[arg(long)]
    report_metrics: Option<bool>,
}

struct IvfFrame<'a> {
    pts_us: i64,
    payload: &'a [u8],
}

/// Scales an IVF timestamp (in `num/den` second units) to microseconds.
fn ivf_pts_us(ts: i64, num: i64, den: i64) -> Result<i64> {
    let scaled = i128::from(ts) * 1_000_000 * i128::from(num) / i128::from(den);
    i64::try_from(scaled).with_context(|| format!("IVF timestamp {ts} overflows microseconds"))
}

fn parse_ivf(data: &[u8]) -> Result<Vec<IvfFrame<'_>>> {
    if data.len() < 32 || &data[..4] != b"DKIF" {
        bail!("not an IVF file");
    }
    if &data[8..12] != b"AV01" {
        bail!("IVF fourcc is {:?}, expected AV01", String::from_utf8_lossy(&data[8..12]));
    }
    let header_len = usize::from(u16::from_le_bytes([data[6], data[7]]));
    let den = i64::from(u32::from_le_bytes([data[16], data[17], data[18], data[19]]));
    let num = i64::from(u32::from_le_bytes([data[20], data[21], data[22], data[23]]));
    if den == 0 {
        bail!("IVF timebase denominator is zero");
    }

    let mut frames = Vec::new();
    let mut pos = header_len.max(32);
    while pos + 12 <= data.len() {
        let size = u32::from_le_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]]);
        let mut ts = [0u8; 8];
        ts.copy_from_slice(&data[pos + 4..pos + 12]);
        let ts = i64::from_le_bytes(ts);
        let start = pos + 12;
        let end = start + size as usize;
        let payload = data
            .get(start..end)
            .with_context(|| format!("frame at byte {pos} runs past end of file"))?;
        frames.push(IvfFrame {
            pts_us: ivf_pts_us(ts, num, den)?,
            payload,
        });
        pos = end;
    }
    Ok(frames)
}

fn main() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
    let args = Args::parse();

    for plugin in builtin_registry().plugins() {
        println!("plugin={} mime={}", plugin.display_name(), plugin.mime_type());
    }

    let data = fs::read(&args.input)
        .with_context(|| format!("failed to read input: {}", args.input.display()))?;
    let frames = parse_ivf(&data).context("failed to parse IVF container")?;

    let mut decoder = DecodeLoop::new(
        Dav1dAdapter,
        Av1ThreadHints::from_thread_count(args.threads),
        LoopSettings {
            output_slots: args.output_slots,
            report_metrics: args.report_metrics,
        },
    )
    .context("failed to create dav1d decoder")?;

    let mut shown = 0usize;
    let mut skipped = 0usize;
    let mut handle = |decoder: &mut DecodeLoop<Dav1dAdapter>, request: &DecodeRequest| {
        let submission = decoder.submit(request).context("submit failed")?;
        let input = submission.input;
        let ended = submission.outcome.is_end_of_stream();
        if let Some(frame) = submission.outcome.into_frame() {
            if frame.should_skip() {
                skipped += 1;
            } else {
                shown += 1;
            }
            decoder
                .release_frame(frame)
                .map_err(|rejected| rejected.error)
                .context("release failed")?;
        }
        anyhow::Ok((input, ended))
    };

    for frame in &frames {
        let request = DecodeRequest::access_unit(frame.payload.to_vec(), TimestampUs(frame.pts_us))
            .with_decode_only(frame.pts_us < args.start_us);
        while handle(&mut decoder, &request)?.0 == InputDisposition::Retained {}
    }
    let eos = DecodeRequest::end_of_stream();
    while !handle(&mut decoder, &eos)?.1 {}

    println!(
        "decoder={}, input_frames={}, shown={}, skipped={}, {}",
        decoder.name(),
        frames.len(),
        shown,
        skipped,
        decoder.summary()
    );
    decoder.release();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ivf_timestamps_scale_to_microseconds() {
        assert_eq!(ivf_pts_us(3, 1, 30).unwrap(), 100_000);
        assert_eq!(ivf_pts_us(90_000, 1, 90_000).unwrap(), 1_000_000);
    }

    #[test]
    fn oversized_ivf_timestamp_is_an_error() {
        assert!(ivf_pts_us(i64::MAX, u32::MAX.into(), 1).is_err());
    }
}
