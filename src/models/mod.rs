pub mod loaders;
pub mod paper;
pub mod run;
pub mod sources;

pub use loaders::load_sources;
pub use paper::{overall_score, CandidatePaper, CuratedPaper, Evaluation, FilterVerdict};
pub use run::{
    CandidateArtifact, CurationArtifact, DateWindow, PublicationArtifact, PublishOutcome,
    RunMetadata, RunOutcome, RunState, RunSummary,
};
pub use sources::{FeedGroup, Persona, SearchQuery, SourceSettings};
