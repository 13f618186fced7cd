pub use crate::app::pipelines::cohort_pipeline::CohortPipeline;
