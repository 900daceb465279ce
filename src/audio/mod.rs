// Audio module - recording decode and container normalization

pub mod normalizer;
pub mod wav;

// Re-export commonly used types for convenience
pub use normalizer::{FormatNormalizer, NormalizedAudio, NATIVE_EXTENSION};
pub use wav::{decode_wav, mix_to_mono, read_wav, DecodedAudio};
