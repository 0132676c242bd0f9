use std::io;

use anyhow::Result;
use clap::{Args, CommandFactory};
use clap_complete::Shell;

use crate::cli::app::App;

#[derive(Args, Clone, Debug)]
pub struct CompletionsArg {
    pub shell: Shell,
}

impl CompletionsArg {
    pub fn execute(&self) -> Result<()> {
        let mut stdout = io::stdout();
        clap_complete::generate(self.shell, &mut App::command(), "sogscat", &mut stdout);
        Ok(())
    }
}
