//! Implementation of the `multiverify agents` command.

use super::load_agents;
use crate::cli::AgentsArgs;
use crate::config::PromptDelivery;
use crate::exit_codes;
use crate::launcher::Launcher;
use anyhow::Result;

pub fn cmd_agents(args: AgentsArgs) -> Result<i32> {
    let agents = load_agents(args.agents_config.as_deref())?;
    let launcher = Launcher::from_process_env();

    if agents.is_empty() {
        println!("No agents configured.");
        return Ok(exit_codes::SUCCESS);
    }

    println!("Configured agents ({}):", agents.len());
    println!();

    for agent in &agents {
        let delivery = match agent.prompt_via {
            PromptDelivery::Stdin => "stdin",
            PromptDelivery::TrailingArgument => "trailing-argument",
        };
        let installed = match launcher.resolve(agent) {
            Some(path) => path.display().to_string(),
            None => "not found on PATH".to_string(),
        };

        println!("  {}", agent.name);
        println!("    Executable:  {} ({})", agent.executable, installed);
        println!("    Prompt via:  {}", delivery);
        if !agent.args.is_empty() {
            let args: Vec<&str> = agent.args.iter().map(|a| a.as_str()).collect();
            println!("    Arguments:   {}", shell_words::join(args));
        }
        if !agent.environment.is_empty() {
            println!("    Environment: {} var(s)", agent.environment.len());
        }
        println!();
    }

    Ok(exit_codes::SUCCESS)
}
