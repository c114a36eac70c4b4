use crate::background::BackgroundProcess;
use std::collections::HashMap;
use std::sync::Arc;

/// Maps process identifiers to their engine instances. Populated once at
/// startup, then shared read-only with the continuation runner and the
/// trigger endpoint.
#[derive(Default)]
pub struct ProcessRegistry {
    processes: HashMap<String, Arc<BackgroundProcess>>,
}

impl ProcessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, process: Arc<BackgroundProcess>) {
        self.processes
            .insert(process.process_id().to_string(), process);
    }

    pub fn get(&self, process_id: &str) -> Option<Arc<BackgroundProcess>> {
        self.processes.get(process_id).cloned()
    }
}
