pub mod fft;
pub mod frame;
pub mod processor;
pub mod source;
pub mod window;

pub use fft::FrequencyExtractor;
pub use frame::{decode_frames, encode_frames, AudioFrameAnalysis, FRAME_RECORD_SIZE, MAX_PEAKS};
pub use processor::{FrameConsumer, Pipeline};
pub use source::{load_wav_mono, save_wav_mono, BufferSource, SampleSource};
pub use window::HistoryBuffer;
