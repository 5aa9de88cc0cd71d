use super::evolution_engine::{GenerationRecord, ProgressCallback};
use std::sync::mpsc::Sender;

/// Reports progress through the `log` facade.
pub struct LogProgressCallback;

impl ProgressCallback for LogProgressCallback {
    fn on_generation_start(&mut self, generation: usize) {
        log::debug!("Generation {} starting...", generation);
    }

    fn on_population_evaluated(&mut self, generation: usize, evaluated: usize, invalid: usize) {
        if invalid > 0 {
            log::warn!(
                "Generation {}: {} of {} new candidates could not be scored",
                generation,
                invalid,
                evaluated
            );
        }
    }

    fn on_generation_complete(&mut self, record: &GenerationRecord, hall_of_fame_size: usize) {
        match record.best_objective {
            Some(best) => log::info!(
                "Generation {} complete. Best objective: {:.4}, Hall of Fame size: {}",
                record.generation,
                best,
                hall_of_fame_size
            ),
            None => log::info!(
                "Generation {} complete. No valid candidate yet, Hall of Fame size: {}",
                record.generation,
                hall_of_fame_size
            ),
        }
    }
}

/// Messages sent by [`ChannelProgressCallback`].
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressMessage {
    GenerationStart(usize),
    PopulationEvaluated { generation: usize, evaluated: usize, invalid: usize },
    GenerationComplete { record: GenerationRecord, hall_of_fame_size: usize },
}

/// Forwards progress to another thread. A dropped receiver is ignored.
pub struct ChannelProgressCallback {
    sender: Sender<ProgressMessage>,
}

impl ChannelProgressCallback {
    pub fn new(sender: Sender<ProgressMessage>) -> Self {
        Self { sender }
    }
}

impl ProgressCallback for ChannelProgressCallback {
    fn on_generation_start(&mut self, generation: usize) {
        let _ = self.sender.send(ProgressMessage::GenerationStart(generation));
    }

    fn on_population_evaluated(&mut self, generation: usize, evaluated: usize, invalid: usize) {
        let _ = self.sender.send(ProgressMessage::PopulationEvaluated {
            generation,
            evaluated,
            invalid,
        });
    }

    fn on_generation_complete(&mut self, record: &GenerationRecord, hall_of_fame_size: usize) {
        let _ = self.sender.send(ProgressMessage::GenerationComplete {
            record: record.clone(),
            hall_of_fame_size,
        });
    }
}
