use crate::backend::{Backend, BackendDevice};

/// Device context a symbol is bound to.
///
/// Operators created from a `Context` run on its device; the context is
/// otherwise opaque to them.
#[derive(Debug, Clone)]
pub struct Context<B: Backend> {
    device: B::Device,
}

impl<B: Backend> Context<B> {
    pub fn new(device: B::Device) -> Self {
        Context { device }
    }

    pub fn device(&self) -> &B::Device {
        &self.device
    }

    /// The per-call execution context handed to `forward`/`backward`.
    pub fn run_context(&self) -> RunContext<'_, B> {
        RunContext {
            device: &self.device,
        }
    }

    pub fn name(&self) -> String {
        self.device.name()
    }
}

/// Execution resources for one operator call.
#[derive(Debug)]
pub struct RunContext<'a, B: Backend> {
    device: &'a B::Device,
}

impl<B: Backend> Clone for RunContext<'_, B> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<B: Backend> Copy for RunContext<'_, B> {}

impl<'a, B: Backend> RunContext<'a, B> {
    pub fn device(&self) -> &'a B::Device {
        self.device
    }
}
