// Format normalizer - transcodes non-WAV containers into the native format
//
// Anything that is not a `.wav` file is fully decoded with symphonia and
// re-encoded as a 32-bit float WAV (same channel count and sample rate) into a
// temporary file. The temporary file lives exactly as long as the returned
// `NormalizedAudio` guard and is deleted when it drops, on every exit path.

use std::fs::File;
use std::path::{Path, PathBuf};

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tempfile::NamedTempFile;

use crate::error::ClassifyError;

/// Extension of the only format the feature extractor reads directly
pub const NATIVE_EXTENSION: &str = "wav";

/// Audio handle ready for the feature extractor
#[derive(Debug)]
pub enum NormalizedAudio {
    /// Input was already WAV and is read in place
    Native(PathBuf),
    /// Input was transcoded; the file is removed when this value drops
    Transcoded {
        source: PathBuf,
        file: NamedTempFile,
    },
}

impl NormalizedAudio {
    /// Path of the WAV file to decode
    pub fn path(&self) -> &Path {
        match self {
            NormalizedAudio::Native(path) => path,
            NormalizedAudio::Transcoded { file, .. } => file.path(),
        }
    }

    pub fn is_transcoded(&self) -> bool {
        matches!(self, NormalizedAudio::Transcoded { .. })
    }
}

/// Converts arbitrary audio containers into native WAV files
#[derive(Debug, Clone, Default)]
pub struct FormatNormalizer {
    temp_dir: Option<PathBuf>,
}

impl FormatNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place transcoded files under `dir` instead of the system temp directory
    pub fn with_temp_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            temp_dir: Some(dir.into()),
        }
    }

    /// True when the path has a `.wav` extension (case-insensitive)
    pub fn is_native(path: &Path) -> bool {
        path.extension()
            .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case(NATIVE_EXTENSION))
            .unwrap_or(false)
    }

    /// Return a WAV handle for `path`, transcoding when needed
    pub fn normalize(&self, path: &Path) -> Result<NormalizedAudio, ClassifyError> {
        if Self::is_native(path) {
            return Ok(NormalizedAudio::Native(path.to_path_buf()));
        }

        let file = self.transcode(path)?;
        log::debug!(
            "[Normalizer] Transcoded {} -> {}",
            path.display(),
            file.path().display()
        );

        Ok(NormalizedAudio::Transcoded {
            source: path.to_path_buf(),
            file,
        })
    }

    fn transcode(&self, path: &Path) -> Result<NamedTempFile, ClassifyError> {
        let pcm = decode_interleaved(path)
            .map_err(|reason| ClassifyError::decode(format!("Conversion to wav failed: {}", reason)))?;

        let mut builder = tempfile::Builder::new();
        builder.prefix("engine-audio-").suffix(".wav");
        let temp = match &self.temp_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };

        let spec = hound::WavSpec {
            channels: pcm.channels,
            sample_rate: pcm.sample_rate,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut writer = hound::WavWriter::create(temp.path(), spec)?;
        for &sample in &pcm.samples {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;

        Ok(temp)
    }
}

/// Interleaved PCM pulled out of a compressed container
struct InterleavedPcm {
    samples: Vec<f32>,
    sample_rate: u32,
    channels: u16,
}

/// Decode an entire file with symphonia, keeping every channel
///
/// Corrupt packets are skipped; the stream ends at EOF.
fn decode_interleaved(path: &Path) -> Result<InterleavedPcm, String> {
    let file = File::open(path).map_err(|e| format!("Failed to open audio file: {}", e))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension() {
        hint.with_extension(&ext.to_string_lossy());
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| format!("Failed to probe audio format: {}", e))?;
    let mut format_reader = probed.format;

    let track = format_reader
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| "No audio tracks found".to_string())?;
    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate;
    let mut channels = track.codec_params.channels.map(|c| c.count() as u16);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| format!("Failed to create decoder: {}", e))?;

    let mut samples: Vec<f32> = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match format_reader.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(format!("Error reading packet: {}", e)),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(msg)) => {
                log::warn!("[Normalizer] Skipping corrupted packet: {}", msg);
                continue;
            }
            Err(e) => return Err(format!("Decode error: {}", e)),
        };

        let spec = *decoded.spec();
        sample_rate.get_or_insert(spec.rate);
        channels.get_or_insert(spec.channels.count() as u16);

        let buf = sample_buf.get_or_insert_with(|| SampleBuffer::new(decoded.capacity() as u64, spec));
        if buf.capacity() < decoded.capacity() * spec.channels.count() {
            *buf = SampleBuffer::new(decoded.capacity() as u64, spec);
        }
        buf.copy_interleaved_ref(decoded);
        samples.extend_from_slice(buf.samples());
    }

    let sample_rate = sample_rate.ok_or_else(|| "Unknown sample rate".to_string())?;
    let channels = channels.filter(|&c| c > 0).ok_or_else(|| "Unknown channel layout".to_string())?;

    if samples.is_empty() {
        return Err("No audio samples decoded".to_string());
    }

    Ok(InterleavedPcm {
        samples,
        sample_rate,
        channels,
    })
}
