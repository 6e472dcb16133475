use pulse_actors::{ActorError, Address, Body, Handler, Message, NodeContext, Result};
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;
use tracing::trace;

/// On every `query`, reads the whole stat file and forwards it as `read`
pub struct ReaderHandler {
    path: PathBuf,
    parser: Address,
}

impl ReaderHandler {
    pub fn new(path: impl Into<PathBuf>, parser: Address) -> Self {
        Self {
            path: path.into(),
            parser,
        }
    }

    fn read_sample(&self) -> Result<Vec<u8>> {
        let mut raw = Vec::new();
        File::open(&self.path)?.read_to_end(&mut raw)?;
        Ok(raw)
    }
}

impl Handler for ReaderHandler {
    fn handle(&mut self, ctx: &NodeContext, message: &Message) -> Result<()> {
        match message.body() {
            Body::Query => {
                let raw = self.read_sample()?;
                trace!(path = ?self.path, bytes = raw.len(), "Sample read");
                ctx.send(self.parser, Message::read(ctx, raw))
            }
            _ => Err(ActorError::unexpected(ctx.address(), message.kind())),
        }
    }
}
