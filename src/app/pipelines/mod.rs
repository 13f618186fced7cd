pub mod cohort_pipeline;
