pub mod evolution_engine;
pub mod genealogy;
pub mod hall_of_fame;
pub mod operators;
pub mod pareto;
pub mod progress;
pub mod selection;

pub use evolution_engine::{
    select, EvolutionEngine, EvolutionOutcome, GenerationRecord, ProgressCallback, Selection, StopReason,
};
pub use genealogy::{CandidateId, Genealogy, GenealogyNode, NodeSummary, Origin};
pub use hall_of_fame::{EliteCandidate, HallOfFame};
pub use progress::{ChannelProgressCallback, LogProgressCallback, ProgressMessage};
pub use selection::{selection_rule, ElitistSelection, Nsga2Selection, SelectionRule};
