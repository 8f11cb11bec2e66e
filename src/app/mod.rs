pub mod assemble;
pub mod bootstrap;
pub mod broker;
pub mod controller;

pub use assemble::{assemble, AssemblyContext};
pub use broker::{AmqpBroker, CandleSink, JobDelivery, JobSource};
pub use controller::JobController;
