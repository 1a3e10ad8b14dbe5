//! CLI command implementations.

mod display;

pub mod at;
pub mod dump;
pub mod find;
pub mod kinds;
pub mod watch;

use std::path::PathBuf;

use janus::{CompileFlags, JanusConfig, Workspace};

/// Global options shared by every command.
pub struct Options {
    pub config: Option<PathBuf>,
    pub include: Vec<PathBuf>,
    pub define: Vec<String>,
    pub standard: Option<String>,
}

impl Options {
    /// Configuration file (if any) with command-line flags merged on top.
    pub fn resolve(&self) -> Result<JanusConfig, janus::Error> {
        let mut config = match &self.config {
            Some(path) => JanusConfig::load(path)?,
            None => JanusConfig::default(),
        };
        config.flags.merge(CompileFlags {
            include_paths: self.include.clone(),
            defines: self.define.clone(),
            standard: self.standard.clone(),
            extra_args: Vec::new(),
        });
        Ok(config)
    }

    pub fn workspace(&self) -> Result<Workspace, janus::Error> {
        Workspace::new(self.resolve()?)
    }
}
