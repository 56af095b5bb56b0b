pub mod encoder;
pub mod interpreter;
pub mod recognizer;
pub mod symbol;
pub mod timeline;

pub use encoder::{decode, encode};
pub use interpreter::{MessageHandler, MorseInterpreter};
pub use recognizer::MorseRecognizer;
pub use symbol::{symbols_to_string, MorseSymbol};
pub use timeline::{Segment, Timeline, ToneSpec};
