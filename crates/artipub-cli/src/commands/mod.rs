pub mod publish;
pub mod snapshot;
mod store_args;
