//! Test and helper doubles for helmcoil_core.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Local};

use crate::error::Result;
use crate::sink::LogSink;
use crate::status::StatusSample;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Sink that keeps everything in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub started: Option<(DateTime<Local>, String)>,
    pub samples: Vec<StatusSample>,
    pub finished: Option<DateTime<Local>>,
}

impl LogSink for MemorySink {
    fn begin(&mut self, start: DateTime<Local>, memo: &str) -> Result<()> {
        self.started = Some((start, memo.to_string()));
        Ok(())
    }

    fn record(&mut self, sample: &StatusSample) -> Result<()> {
        self.samples.push(sample.clone());
        Ok(())
    }

    fn finish(&mut self, end: DateTime<Local>) -> Result<()> {
        self.finished = Some(end);
        Ok(())
    }
}

/// Instrument that answers queries from per-command reply queues.
///
/// The last reply queued for a command is repeated once the queue drains.
/// Writes are recorded and always succeed unless `fail_writes` is set.
#[derive(Debug, Default)]
pub struct ScriptedInstrument {
    replies: HashMap<String, VecDeque<String>>,
    pub writes: Vec<String>,
    pub fail_writes: bool,
}

impl ScriptedInstrument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(mut self, command: &str, reply: &str) -> Self {
        self.replies
            .entry(command.to_string())
            .or_default()
            .push_back(reply.to_string());
        self
    }

    pub fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }
}

impl helmcoil_traits::Instrument for ScriptedInstrument {
    fn query(&mut self, command: &str) -> std::result::Result<String, BoxError> {
        let queue = self
            .replies
            .get_mut(command)
            .ok_or_else(|| -> BoxError { format!("no scripted reply for {command}").into() })?;
        let reply = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };
        reply.ok_or_else(|| format!("no scripted reply for {command}").into())
    }

    fn write(&mut self, command: &str) -> std::result::Result<(), BoxError> {
        if self.fail_writes {
            return Err(format!("write timeout: {command}").into());
        }
        self.writes.push(command.to_string());
        Ok(())
    }
}
