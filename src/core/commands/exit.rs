use super::{Command, CommandContext, CommandError};

#[derive(Clone, Copy, Default)]
pub struct ExitCommand;

impl Command for ExitCommand {
    fn execute(&self, ctx: &mut CommandContext<'_>, _args: &[String]) -> Result<(), CommandError> {
        ctx.request_exit();
        Ok(())
    }

    fn description(&self) -> &str {
        "Leave the shell"
    }
}
