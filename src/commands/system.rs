use colored::Colorize;

/// What the REPL should do after a system command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

pub fn handle_command(input: &str) -> Result<Flow, String> {
    match input.to_lowercase().as_str() {
        "help" => {
            println!("\n📚 Policy Assistant Commands:");
            println!("  Just type your question");
            println!("  Examples:");
            println!("    - how many days of paid leave do I get?");
            println!("    - what is the notice period for resignation?");
            println!();

            println!("🔍 Retrieval Commands:");
            println!("  search <question>  - Show the matching chunks without answering");
            println!("  status             - Show index and backend chain");
            println!("  reload             - Reload the index from disk");
            println!();

            println!("⚙️ System Commands:");
            println!("  help  - Show this help menu");
            println!("  exit  - Exit the program");
            println!();
            Ok(Flow::Continue)
        }
        "exit" | "quit" => {
            println!("{}", "👋 Goodbye!".bright_blue());
            Ok(Flow::Exit)
        }
        _ => Err("Unknown system command. Type 'help' for available commands.".to_string()),
    }
}
