mod refresh;
mod task;

pub use refresh::{refresh, RefreshStores};
pub use task::CollectorTask;
