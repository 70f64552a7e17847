//! Domain types: queries, plans, results, reports, runs, and events.

pub mod events;
pub mod plan;
pub mod query;
pub mod report;
pub mod run;

pub use events::{Level, Phase, ProgressEvent};
pub use plan::{SearchItem, SearchPlan, PLAN_MAX_SEARCHES, PLAN_MIN_SEARCHES};
pub use query::{ResearchQuery, MIN_QUERY_LEN};
pub use report::{Report, SearchOutcome, SearchResult};
pub use run::{DeliveryOutcome, DeliveryStatus, Run, RunState};
