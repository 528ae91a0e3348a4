//! Data model shared by the engine

pub mod flow;
pub mod request;
pub mod response;
pub mod scope;

pub use flow::{Flow, FlowExecutionResult, FlowStatus, FlowStep, FlowStepResult, StepStatus};
pub use request::{
    AuthConfig, BodyType, ConnectionFlavor, FormField, FormFile, GraphQlRequest, HttpMethod,
    OperationType, Request, RequestCommon, RequestKind, ResponseExtraction, RestRequest,
    SubscriptionTransport, WebSocketRequest,
};
pub use response::{RequestResponse, SentRequest, StreamEvent};
pub use scope::{
    Collection, DynamicGenerator, DynamicVariable, Environment, GeneratorConstraints,
    VariableScope,
};
