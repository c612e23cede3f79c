use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "relaychat")]
#[command(version, about = "Terminal chat client for a relaychat relay")]
pub struct Cli {
    /// Relay chat endpoint
    #[arg(long, env = "RELAYCHAT_RELAY_URL", default_value = "http://127.0.0.1:3000/api/chat")]
    pub relay_url: String,

    /// Local store for sessions and settings
    #[arg(long, env = "RELAYCHAT_DATABASE_URL", default_value = "sqlite://relaychat.db")]
    pub database_url: String,

    /// Tracing filter; logs go to stderr
    #[arg(long, env = "RELAYCHAT_LOG", default_value = "warn")]
    pub log: String,
}

/// One line typed at the prompt.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Send(String),
    New,
    List,
    Switch(String),
    Delete(String),
    Retry,
    Model(String),
    System(String),
    Temperature(f32),
    MaxTokens(u32),
    Settings,
    Clear,
    Help,
    Quit,
}

pub const HELP: &str = "\
commands:
  /new                  start a new session
  /list                 list sessions
  /switch <id>          switch to a session and show it
  /delete <id>          delete a session
  /retry                resend the last user message
  /model <name>         set the model
  /system <text>        set the system prompt
  /temperature <f>      set the sampling temperature
  /max-tokens <n>       set the response token limit
  /settings             show the current settings
  /clear                delete all sessions and settings
  /quit                 exit
anything else is sent as a message; Ctrl-C stops a reply in progress";

impl Input {
    pub fn parse(line: &str) -> Result<Input, String> {
        let line = line.trim();
        let Some(command) = line.strip_prefix('/') else {
            return Ok(Input::Send(line.to_owned()));
        };
        let (name, arg) = match command.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (command, ""),
        };

        let required = |what: &str| {
            if arg.is_empty() {
                Err(format!("/{name} needs {what}"))
            } else {
                Ok(arg.to_owned())
            }
        };

        match name {
            "new" => Ok(Input::New),
            "list" => Ok(Input::List),
            "switch" => required("a session id").map(Input::Switch),
            "delete" => required("a session id").map(Input::Delete),
            "retry" => Ok(Input::Retry),
            "model" => required("a model name").map(Input::Model),
            "system" => required("a prompt").map(Input::System),
            "temperature" => required("a number")?
                .parse()
                .map(Input::Temperature)
                .map_err(|e| format!("invalid temperature: {e}")),
            "max-tokens" => required("a number")?
                .parse()
                .map(Input::MaxTokens)
                .map_err(|e| format!("invalid token limit: {e}")),
            "settings" => Ok(Input::Settings),
            "clear" => Ok(Input::Clear),
            "help" | "?" => Ok(Input::Help),
            "quit" | "exit" => Ok(Input::Quit),
            other => Err(format!("unknown command /{other}; try /help")),
        }
    }
}
