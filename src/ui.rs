use crate::grammar::{usage, GRAMMAR};
use crate::types::Plan;
use crossterm::style::Stylize;
use std::{
    collections::VecDeque,
    io::{self, BufRead, Write},
};

/// The human on the other side: one line in, lines out.
pub trait Console {
    /// `Ok(None)` at end of input.
    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>>;
    /// Something Sol says to the user.
    fn say(&mut self, message: &str);
    /// Plain console output (plans, reports).
    fn print(&mut self, line: &str);
}

/// Optional voice output. Owned by the session, never global.
pub trait Speaker {
    fn is_available(&self) -> bool;
    fn speak(&mut self, text: &str) -> bool;
}

#[derive(Debug, Default)]
pub struct Silent;

impl Speaker for Silent {
    fn is_available(&self) -> bool {
        false
    }

    fn speak(&mut self, _text: &str) -> bool {
        false
    }
}

#[derive(Debug, Default)]
pub struct StdConsole;

impl Console for StdConsole {
    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        print!("{}", prompt);
        io::stdout().flush()?;
        let mut input = String::new();
        let n = io::stdin().lock().read_line(&mut input)?;
        if n == 0 {
            return Ok(None);
        }
        Ok(Some(input.trim_end_matches(&['\r', '\n'][..]).to_string()))
    }

    fn say(&mut self, message: &str) {
        println!("{} {}", "Sol:".cyan().bold(), message);
    }

    fn print(&mut self, line: &str) {
        println!("{}", line);
    }
}

/// Console fed from a script, recording everything written. Used by tests.
#[derive(Debug, Default)]
pub struct ScriptedConsole {
    inputs: VecDeque<String>,
    pub said: Vec<String>,
    pub printed: Vec<String>,
}

impl ScriptedConsole {
    pub fn new<I, S>(inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            inputs: inputs.into_iter().map(Into::into).collect(),
            said: Vec::new(),
            printed: Vec::new(),
        }
    }

    pub fn transcript(&self) -> String {
        let mut all = self.said.clone();
        all.extend(self.printed.iter().cloned());
        all.join("\n")
    }
}

impl Console for ScriptedConsole {
    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        self.printed.push(prompt.to_string());
        Ok(self.inputs.pop_front())
    }

    fn say(&mut self, message: &str) {
        self.said.push(message.to_string());
    }

    fn print(&mut self, line: &str) {
        self.printed.push(line.to_string());
    }
}

pub fn print_plan(console: &mut dyn Console, plan: &Plan) {
    console.print("");
    console.print("Plano de ação:");
    for (i, step) in plan.steps.iter().enumerate() {
        console.print(&format!("  {}. {}", i + 1, step));
    }
}

pub fn print_banner(console: &mut dyn Console, safe_mode: bool, ai_configured: bool) {
    console.print(&format!("{}", "Sol - assistente de ações confirmadas".bold()));
    console.print(&format!(
        "  modo: {}",
        if safe_mode {
            "SEGURO (simulação)".green().to_string()
        } else {
            "EXECUÇÃO REAL".red().bold().to_string()
        }
    ));
    console.print(&format!(
        "  ia:   {}",
        if ai_configured {
            "OpenAI configurada"
        } else {
            "modo demonstração (palavras-chave)"
        }
    ));
    console.print("");
    console.print("Digite pedidos em linguagem natural, ex.: 'abre o YouTube'.");
    console.print("Comandos: sair, status, modo, historico, ajuda, diagnostico");
}

pub fn print_help(console: &mut dyn Console) {
    console.print("");
    console.print("Ações que a Sol sabe planejar:");
    for entry in GRAMMAR {
        console.print(&format!("  {:<40} {}", usage(entry), entry.description));
    }
}

pub fn format_gb(bytes: u64) -> String {
    format!("{:.1}GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
}
