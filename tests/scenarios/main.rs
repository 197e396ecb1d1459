//! Scenario tests: pipelines composed and run against a scripted engine

mod helpers;

mod composition;
mod end_to_end;
mod failure_handling;
mod injection;
mod test_pipeline;
