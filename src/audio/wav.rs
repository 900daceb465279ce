// WAV decoding - the pipeline's native input format
//
// Reads an uncompressed WAV file at its original sample rate and mixes all
// channels down to a single mono track. Integer PCM is scaled into [-1.0, 1.0]
// by 2^(bits - 1); float PCM is passed through unchanged.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::error::ClassifyError;

/// Mono PCM decoded from a native-format file
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    /// Mono samples in range [-1.0, 1.0]
    pub samples: Vec<f32>,
    /// Sample rate of the source file (never resampled)
    pub sample_rate: u32,
    /// Channel count of the source before mixdown
    pub source_channels: u16,
}

impl DecodedAudio {
    /// Duration of the decoded signal in milliseconds
    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        self.samples.len() as u64 * 1000 / self.sample_rate as u64
    }
}

/// Decode a WAV file from disk
pub fn read_wav(path: &Path) -> Result<DecodedAudio, ClassifyError> {
    let file = File::open(path)?;
    decode_wav(BufReader::new(file))
}

/// Decode WAV data from any reader
pub fn decode_wav<R: Read>(reader: R) -> Result<DecodedAudio, ClassifyError> {
    let mut reader = hound::WavReader::new(reader)?;
    let spec = reader.spec();

    if spec.channels == 0 {
        return Err(ClassifyError::decode("WAV header declares zero channels"));
    }
    if spec.sample_rate == 0 {
        return Err(ClassifyError::decode("WAV header declares a zero sample rate"));
    }

    let interleaved = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .map(|sample| sample.map_err(ClassifyError::from))
            .collect::<Result<Vec<f32>, _>>()?,
        hound::SampleFormat::Int => {
            if spec.bits_per_sample == 0 || spec.bits_per_sample > 32 {
                return Err(ClassifyError::decode(format!(
                    "unsupported bits_per_sample={}",
                    spec.bits_per_sample
                )));
            }
            let scale = 1.0 / (1u64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|sample| {
                    sample
                        .map(|v| v as f32 * scale)
                        .map_err(ClassifyError::from)
                })
                .collect::<Result<Vec<f32>, _>>()?
        }
    };

    if interleaved.is_empty() {
        return Err(ClassifyError::decode("audio contains no samples"));
    }

    let samples = mix_to_mono(&interleaved, spec.channels as usize);

    Ok(DecodedAudio {
        samples,
        sample_rate: spec.sample_rate,
        source_channels: spec.channels,
    })
}

/// Average interleaved frames down to mono
pub fn mix_to_mono(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }

    interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}
