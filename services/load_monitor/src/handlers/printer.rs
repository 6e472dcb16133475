use super::Output;
use pulse_actors::{ActorError, Body, Handler, Message, NodeContext, Result};
use std::fmt::Write as _;
use std::io::Write;

/// Writes one line per `print` message
pub struct PrinterHandler {
    out: Output,
}

impl PrinterHandler {
    pub fn new(out: Output) -> Self {
        Self { out }
    }
}

/// `core 0: 12.50% core 1: 3.00%`
pub fn format_loads(loads: &[f32]) -> String {
    let mut line = String::with_capacity(loads.len() * 16);
    for (core, load) in loads.iter().enumerate() {
        if core > 0 {
            line.push(' ');
        }
        let _ = write!(line, "core {}: {:.2}%", core, load);
    }
    line
}

impl Handler for PrinterHandler {
    fn handle(&mut self, ctx: &NodeContext, message: &Message) -> Result<()> {
        match message.body() {
            Body::Print(loads) => {
                writeln!(self.out, "{}", format_loads(loads))?;
                self.out.flush()?;
                Ok(())
            }
            _ => Err(ActorError::unexpected(ctx.address(), message.kind())),
        }
    }
}
