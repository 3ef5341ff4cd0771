use super::{Command, CommandContext, CommandError};

#[derive(Clone, Default)]
pub struct CdCommand;

impl CdCommand {
    pub fn new() -> Self {
        Self
    }
}

impl Command for CdCommand {
    fn execute(&self, ctx: &mut CommandContext<'_>, args: &[String]) -> Result<(), CommandError> {
        ctx.session.change_directory(args)?;
        Ok(())
    }

    fn description(&self) -> &str {
        "Change the working directory"
    }
}
