//! The human gate between planning and doing. Fails closed: anything that
//! is not a recognised yes is a no.

use crate::grammar::Step;
use crate::ui::Console;
use tracing::{debug, warn};

const AFFIRMATIVE: &[&str] = &["s", "sim", "y", "yes", "ok", "pode", "vai"];
const NEGATIVE: &[&str] = &["n", "nao", "não", "no", "para", "cancela"];
pub const CONFIRM_TOKEN: &str = "CONFIRMO";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    Yes,
    No,
    Unrecognized,
}

pub fn interpret(response: &str) -> Answer {
    let response = response.trim().to_lowercase();
    if AFFIRMATIVE.contains(&response.as_str()) {
        Answer::Yes
    } else if NEGATIVE.contains(&response.as_str()) {
        Answer::No
    } else {
        Answer::Unrecognized
    }
}

fn read(console: &mut dyn Console, prompt: &str) -> Option<String> {
    match console.read_line(prompt) {
        Ok(line) => line,
        Err(e) => {
            warn!("failed to read confirmation: {}", e);
            None
        }
    }
}

pub fn confirm(console: &mut dyn Console) -> bool {
    console.say("Posso executar esses passos?");
    let Some(response) = read(console, "   's' para SIM ou 'n' para NÃO: ") else {
        return false;
    };
    match interpret(&response) {
        Answer::Yes => true,
        Answer::No => false,
        Answer::Unrecognized => {
            debug!("unrecognized confirmation: {:?}", response);
            console.print("   Resposta não reconhecida. Por segurança, cancelando...");
            false
        }
    }
}

/// Enumerates every step and requires the literal `CONFIRMO`.
pub fn confirm_detailed(console: &mut dyn Console, steps: &[Step]) -> bool {
    console.print("");
    console.print("CONFIRMAÇÃO DETALHADA NECESSÁRIA");
    console.print("   As seguintes ações serão executadas:");
    for (i, step) in steps.iter().enumerate() {
        console.print(&format!("   {}. {}", i + 1, step));
    }
    read(
        console,
        "   Digite 'CONFIRMO' para executar ou qualquer outra coisa para cancelar: ",
    )
    .map(|r| r.trim() == CONFIRM_TOKEN)
    .unwrap_or(false)
}
