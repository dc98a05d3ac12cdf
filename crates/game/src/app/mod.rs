pub(crate) mod bootstrap;
pub(crate) mod commands;
pub(crate) mod flow;
pub(crate) mod loop_runner;
