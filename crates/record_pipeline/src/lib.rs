pub mod logging;
pub mod pipeline;
pub mod record;

pub use pipeline::{
    Outcome, Pipeline, PipelineConfig, PipelineReport, ProcessingFailure, ResultToken,
    SimulatedPersistence, UnitOfWorkHandler,
};
pub use record::{ActivityGenerator, IdentityGenerator, RecordGenerator, UserRecord};
