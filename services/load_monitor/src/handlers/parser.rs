use crate::stats::{average_load, parse_samples, CpuSample};
use pulse_actors::{ActorError, Address, Body, Handler, Message, NodeContext, Result};
use tracing::{debug, warn};

/// Turns successive raw samples into per-core load for the printer
///
/// The first sample only primes the previous-sample state. A sample that
/// fails to parse, or has no per-core lines, is dropped with a warning and
/// does not replace it.
pub struct ParserHandler {
    printer: Address,
    previous: Vec<CpuSample>,
}

impl ParserHandler {
    pub fn new(printer: Address) -> Self {
        Self {
            printer,
            previous: Vec::new(),
        }
    }

    /// Load per core, indexed by core number. Cores without a previous
    /// sample report 0.
    pub fn loads(previous: &[CpuSample], current: &[CpuSample]) -> Vec<f32> {
        let cores = current.iter().map(|s| usize::from(s.core) + 1).max().unwrap_or(0);
        let mut loads = vec![0.0; cores];
        for sample in current {
            if let Some(before) = previous.iter().find(|p| p.core == sample.core) {
                loads[usize::from(sample.core)] = average_load(before, sample);
            }
        }
        loads
    }
}

impl Handler for ParserHandler {
    fn handle(&mut self, ctx: &NodeContext, message: &Message) -> Result<()> {
        let raw = match message.body() {
            Body::Read(raw) => raw,
            _ => return Err(ActorError::unexpected(ctx.address(), message.kind())),
        };

        let text = String::from_utf8_lossy(raw);
        let samples = match parse_samples(&text) {
            Ok(samples) => samples,
            Err(err) => {
                warn!(address = %ctx.address(), error = %err, "Dropping malformed sample");
                return Ok(());
            }
        };

        if samples.is_empty() {
            warn!(address = %ctx.address(), "Sample has no per-core lines");
            return Ok(());
        }

        if self.previous.is_empty() {
            debug!(cores = samples.len(), "First sample stored");
            self.previous = samples;
            return Ok(());
        }

        let loads = Self::loads(&self.previous, &samples);
        self.previous = samples;
        ctx.send(self.printer, Message::print(ctx, loads))
    }
}
