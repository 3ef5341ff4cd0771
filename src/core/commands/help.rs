use super::{Command, CommandContext, CommandError};
use crate::shell::transcript::StyleTag;

/// Lists every name the resolver knows about, or just the one named. Lines use the labeled form so
/// names render emphasised.
#[derive(Clone, Copy, Default)]
pub struct HelpCommand;

impl Command for HelpCommand {
    fn execute(&self, ctx: &mut CommandContext<'_>, args: &[String]) -> Result<(), CommandError> {
        let wanted = args.first().map(|name| name.to_lowercase());
        if let Some(name) = &wanted {
            if !ctx.catalog.contains_key(name) {
                return Err(CommandError::InvalidArguments("help", format!("unknown command {name}")));
            }
        }

        let entries: Vec<_> = ctx
            .catalog
            .iter()
            .filter(|(name, _)| wanted.as_ref().map_or(true, |w| w == *name))
            .collect();
        let width = entries.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
        for (name, description) in entries {
            ctx.transcript.append(&format!("{name:<width$}:"), StyleTag::Label);
            ctx.transcript
                .append_line(&format!(" {description}"), StyleTag::Plain);
        }
        Ok(())
    }

    fn description(&self) -> &str {
        "List available commands"
    }
}
