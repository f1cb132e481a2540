use crate::heaven::{Heaven, RenderTarget};
use crate::router::InputReceiver;
use padlight_domain_signal::Signal;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

pub type StageId = u64;

/// One processing step. A stage may drop a signal (empty result), pass it
/// on, or fan it out.
pub trait Stage: Send {
    fn process(&mut self, signal: Signal) -> Vec<Signal>;

    fn name(&self) -> &str;
}

pub struct SetLayer(pub i32);

impl Stage for SetLayer {
    fn process(&mut self, mut signal: Signal) -> Vec<Signal> {
        signal.layer = self.0;
        vec![signal]
    }

    fn name(&self) -> &str {
        "set-layer"
    }
}

/// Adds to the signal's delay.
pub struct Delay(pub u32);

impl Stage for Delay {
    fn process(&mut self, mut signal: Signal) -> Vec<Signal> {
        signal.delay_ms = signal.delay_ms.saturating_add(self.0);
        vec![signal]
    }

    fn name(&self) -> &str {
        "delay"
    }
}

pub enum MultiTarget {
    Push(u32),
    Pop,
}

impl Stage for MultiTarget {
    fn process(&mut self, mut signal: Signal) -> Vec<Signal> {
        match self {
            MultiTarget::Push(target) => signal.multi_target.push(*target),
            MultiTarget::Pop => {
                signal.multi_target.pop();
            }
        }
        vec![signal]
    }

    fn name(&self) -> &str {
        match self {
            MultiTarget::Push(_) => "multi-target-push",
            MultiTarget::Pop => "multi-target-pop",
        }
    }
}

pub struct FnStage<F> {
    name: String,
    f: F,
}

impl<F> FnStage<F>
where
    F: FnMut(Signal) -> Vec<Signal> + Send,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F> Stage for FnStage<F>
where
    F: FnMut(Signal) -> Vec<Signal> + Send,
{
    fn process(&mut self, signal: Signal) -> Vec<Signal> {
        (self.f)(signal)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

struct Output {
    heaven: Arc<Heaven>,
    target: Arc<dyn RenderTarget>,
}

/// Ordered chain of stages. Stages live in an arena keyed by id; `order`
/// alone decides the processing sequence.
#[derive(Default)]
pub struct Pipeline {
    stages: HashMap<StageId, Box<dyn Stage>>,
    order: Vec<StageId>,
    next_id: StageId,
    output: Option<Output>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_output(heaven: Arc<Heaven>, target: Arc<dyn RenderTarget>) -> Self {
        let mut pipeline = Self::new();
        pipeline.set_output(heaven, target);
        pipeline
    }

    pub fn set_output(&mut self, heaven: Arc<Heaven>, target: Arc<dyn RenderTarget>) {
        self.output = Some(Output { heaven, target });
    }

    pub fn clear_output(&mut self) {
        self.output = None;
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn order(&self) -> &[StageId] {
        &self.order
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.order
            .iter()
            .filter_map(|id| self.stages.get(id))
            .map(|stage| stage.name())
            .collect()
    }

    pub fn push(&mut self, stage: Box<dyn Stage>) -> StageId {
        let position = self.order.len();
        self.insert(position, stage)
    }

    /// Insert at `position` (clamped to the end).
    pub fn insert(&mut self, position: usize, stage: Box<dyn Stage>) -> StageId {
        let id = self.next_id;
        self.next_id += 1;
        self.stages.insert(id, stage);
        self.order.insert(position.min(self.order.len()), id);
        id
    }

    pub fn remove(&mut self, id: StageId) -> Option<Box<dyn Stage>> {
        self.order.retain(|existing| *existing != id);
        self.stages.remove(&id)
    }

    /// Returns false for an unknown id.
    pub fn move_stage(&mut self, id: StageId, position: usize) -> bool {
        let Some(current) = self.order.iter().position(|existing| *existing == id) else {
            return false;
        };
        self.order.remove(current);
        self.order.insert(position.min(self.order.len()), id);
        true
    }

    /// Run a signal through every stage and return what comes out.
    pub fn run(&mut self, signal: Signal) -> Vec<Signal> {
        let mut signals = vec![signal];
        for id in &self.order {
            let Some(stage) = self.stages.get_mut(id) else {
                continue;
            };
            signals = signals
                .into_iter()
                .flat_map(|signal| stage.process(signal))
                .collect();
            if signals.is_empty() {
                break;
            }
        }
        signals
    }

    /// Run a signal and file the results with the scheduler.
    pub fn send(&mut self, signal: Signal) -> usize {
        let signals = self.run(signal);
        let Some(output) = &self.output else {
            return 0;
        };
        let count = signals.len();
        for signal in signals {
            output.heaven.schedule(output.target.clone(), signal);
        }
        count
    }
}

impl InputReceiver for Mutex<Pipeline> {
    fn on_signal(&self, signal: Signal) {
        self.lock().send(signal);
    }
}
