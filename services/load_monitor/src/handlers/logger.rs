use super::Output;
use pulse_actors::time::monotonic_ms;
use pulse_actors::{ActorError, Body, Handler, Message, NodeContext, Result};
use std::io::Write;

/// Writes `<monotonic ms>, from <sender>: <text>` for every `log` message
pub struct LoggerHandler {
    out: Output,
}

impl LoggerHandler {
    pub fn new(out: Output) -> Self {
        Self { out }
    }
}

impl Handler for LoggerHandler {
    fn handle(&mut self, ctx: &NodeContext, message: &Message) -> Result<()> {
        match message.body() {
            Body::Log(text) => {
                writeln!(self.out, "{}, from {}: {}", monotonic_ms(), message.sender(), text)?;
                self.out.flush()?;
                Ok(())
            }
            _ => Err(ActorError::unexpected(ctx.address(), message.kind())),
        }
    }
}
