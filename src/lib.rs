pub mod approval;
pub mod audit;
pub mod channels;
pub mod config;
pub mod error;
pub mod ingress;
pub mod installer;
pub mod llm;
pub mod logging;
pub mod multiplexer;
pub mod pipeline;
pub mod policy;
pub mod rules;
pub mod session;
pub mod transcript;
