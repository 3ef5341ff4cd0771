use super::{Command, CommandContext, CommandError};

/// Wipes the rendered transcript. The working directory is left alone.
#[derive(Clone, Copy, Default)]
pub struct ClearCommand;

impl Command for ClearCommand {
    fn execute(&self, ctx: &mut CommandContext<'_>, _args: &[String]) -> Result<(), CommandError> {
        ctx.transcript.clear_all();
        Ok(())
    }

    fn description(&self) -> &str {
        "Clear the terminal"
    }
}
