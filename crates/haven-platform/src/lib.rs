pub mod speech;
pub mod storage;
pub mod transport;


pub use speech::ScriptedSpeech;
pub use storage::MemoryStorage;
pub use transport::MockTransport;
