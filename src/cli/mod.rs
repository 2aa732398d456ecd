//! CLI subcommand implementations for the gm2-search binary.

pub mod search_cmd;
pub mod serve;
