//! Flow orchestration and single request execution

pub mod overlay;
pub mod report;
pub mod runner;
pub mod single;

pub use overlay::{StepScope, VariableOverlay};
pub use report::{format_flow_result, format_flow_result_json};
pub use runner::{classify, FlowRunner};
pub use single::RequestRunner;
