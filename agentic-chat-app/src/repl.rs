//! Interactive session loop - history lives in memory for the session.

use crate::output::{write_reply, write_stream, OutputFormat};
use agentic_chat_runtime::{AgentDefinition, Engine, Message, Reply};
use anyhow::Result;
use std::io::{self, BufRead, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplControl {
    Continue,
    Exit,
}

pub struct Repl {
    engine: Engine,
    definition: AgentDefinition,
    history: Vec<Message>,
    stream: bool,
}

impl Repl {
    pub fn new(engine: Engine, definition: AgentDefinition, stream: bool) -> Self {
        Self {
            engine,
            definition,
            history: Vec::new(),
            stream,
        }
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    pub async fn run(&mut self) -> Result<()> {
        let mut stdout = io::stdout();
        writeln!(stdout, "Agent: {}", self.definition.config.name)?;
        if let Some(description) = &self.definition.config.description {
            writeln!(stdout, "{}", description)?;
        }
        writeln!(stdout, "Model: {}", self.definition.config.model)?;
        writeln!(stdout, "Commands: exit, help, history, clear\n")?;

        let stdin = io::stdin();
        loop {
            write!(stdout, "you> ")?;
            stdout.flush()?;

            let mut input = String::new();
            if stdin.lock().read_line(&mut input)? == 0 {
                break;
            }

            if self.handle_line(&input, &mut stdout).await? == ReplControl::Exit {
                break;
            }
        }

        Ok(())
    }

    /// Handle one line of input, writing everything to `out`.
    pub async fn handle_line<W: Write>(&mut self, line: &str, out: &mut W) -> Result<ReplControl> {
        let input = line.trim();
        match input {
            "" => {}
            "exit" | "quit" => {
                writeln!(out, "Goodbye!")?;
                return Ok(ReplControl::Exit);
            }
            "help" => {
                writeln!(out, "  exit, quit  - Leave the session")?;
                writeln!(out, "  history     - Show the conversation so far")?;
                writeln!(out, "  clear       - Forget the conversation")?;
                writeln!(out, "  help        - Show this message")?;
            }
            "history" => {
                if self.history.is_empty() {
                    writeln!(out, "(empty)")?;
                }
                for message in &self.history {
                    writeln!(out, "[{}] {}", message.role, message.content)?;
                }
            }
            "clear" => {
                self.history.clear();
                writeln!(out, "History cleared.")?;
            }
            _ => self.respond(input, out).await?,
        }
        Ok(ReplControl::Continue)
    }

    /// Run one turn. History only advances when the agent answered.
    async fn respond<W: Write>(&mut self, input: &str, out: &mut W) -> Result<()> {
        let mut history = self.history.clone();
        history.push(Message::user(input));

        let config = &self.definition.config;
        let tools = &self.definition.tools;

        let answer = if self.stream {
            let fragments = self.engine.stream(config, tools, history.clone())?;
            let transcript = write_stream(fragments, OutputFormat::Text, out).await?;
            (!transcript.failed).then_some(transcript.text)
        } else {
            let output = self.engine.run(config, tools, history.clone()).await?;
            let answer = match &output.reply {
                Reply::Content(content) => Some(content.clone()),
                Reply::NoResponse => Some(String::new()),
                Reply::Failed(_) => None,
            };
            write_reply(output.reply, OutputFormat::Text, out)?;
            answer
        };

        if let Some(answer) = answer {
            if !answer.is_empty() {
                history.push(Message::assistant(answer));
            }
            self.history = history;
        }
        Ok(())
    }
}
