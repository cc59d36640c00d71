pub mod clock;

pub use clock::{Clock, ManualClock, MonotonicClock};

/// Request/response command channel to a single instrument.
///
/// Replies are returned exactly as the device sent them, terminator included;
/// stripping fixed prefixes and units is the caller's job.
pub trait Instrument {
    fn query(&mut self, command: &str) -> Result<String, Box<dyn std::error::Error + Send + Sync>>;
    fn write(&mut self, command: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

impl<I: Instrument + ?Sized> Instrument for Box<I> {
    fn query(&mut self, command: &str) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        (**self).query(command)
    }

    fn write(&mut self, command: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).write(command)
    }
}
